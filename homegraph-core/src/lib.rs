pub mod bus;
pub mod error;
pub mod forms;
pub mod model;
pub mod repository;
pub mod settings;
pub mod state;
pub mod storage;
pub mod validation;
