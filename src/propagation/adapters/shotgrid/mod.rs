//! ShotGrid REST adapter.
//!
//! Authenticates with script credentials (client-credentials grant), reads
//! entities through `GET /api/v1/entity/{collection}/{id}`, searches step
//! tasks through `POST /api/v1/entity/tasks/_search`, and writes
//! `sg_status_list` through `PUT`.

mod client;
mod models;

pub use client::{ShotgridSettings, ShotgridTracker};
