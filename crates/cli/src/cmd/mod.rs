pub mod extract;
pub mod post_job;
