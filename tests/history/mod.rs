mod archive_and_query;
mod migration;
