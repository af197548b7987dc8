pub mod calendar;
pub mod docs;
pub mod episodes;
pub mod field_contacts;
pub mod health_council;
pub mod hiring;
pub mod media_kit;
pub mod mission_control;
pub mod pages;
pub mod people;
pub mod production;
pub mod roadmap;
pub mod series;
pub mod sponsors;
pub mod tasks;
