pub use super::app_info::Entity as AppInfo;
pub use super::app_node::Entity as AppNode;
pub use super::config_resource_value::Entity as ConfigResourceValue;
pub use super::configuration::Entity as Configuration;
pub use super::configuration_history::Entity as ConfigurationHistory;
pub use super::configuration_publish::Entity as ConfigurationPublish;
pub use super::configuration_resource_relation::Entity as ConfigurationResourceRelation;
pub use super::configuration_status::Entity as ConfigurationStatus;
pub use super::operation_log::Entity as OperationLog;
