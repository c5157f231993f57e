mod commit_happy;
mod local_fallback;
