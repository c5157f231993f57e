mod crash_resume;
mod discard;
mod rollback_inverse;
mod undo_resume;
