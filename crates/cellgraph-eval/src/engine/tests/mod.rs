mod common;
mod component_query;
mod link_traversal;
mod record_loader;
mod references;
