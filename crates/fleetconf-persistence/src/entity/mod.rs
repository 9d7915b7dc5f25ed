//! SeaORM entities

pub mod prelude;

pub mod app_info;
pub mod app_node;
pub mod config_resource_value;
pub mod configuration;
pub mod configuration_history;
pub mod configuration_publish;
pub mod configuration_resource_relation;
pub mod configuration_status;
pub mod operation_log;
