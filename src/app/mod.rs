pub mod alert_use_case;
pub mod ports;
pub mod publish_use_case;
pub mod sheet_target;
