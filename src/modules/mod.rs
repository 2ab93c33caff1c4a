pub mod jobs;
pub mod lots;
pub mod migration;
pub mod references;
pub mod transport;
