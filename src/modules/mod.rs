pub mod content;
pub mod credentials;
pub mod media;
pub mod publish;
pub mod publish_job;
pub mod scheduler;
