pub mod data {
    pub mod datasources {
        pub mod account_datasource;
        pub(crate) mod app_store_server_notification_datasource;
        pub mod audit_trail_datasource;
        pub(crate) mod key_set_datasource;
        pub mod purchase_record_datasource;
        pub(crate) mod verify_receipt_datasource;
        pub(crate) mod utils;
    }
    pub(crate) mod models {
        pub(crate) mod app_store_server_api {
            pub(crate) mod common;
            pub(crate) mod jws_transaction_decoded_payload_model;
        }
        pub(crate) mod app_store_server_notifications {
            pub(crate) mod response_body_v2_decoded_payload_model;
            pub(crate) mod response_body_v2_model;
        }
        pub(crate) mod verify_receipt {
            pub(crate) mod verify_receipt_request_model;
            pub(crate) mod verify_receipt_response_model;
        }
    }
    pub(crate) mod repositories {
        pub(crate) mod notification_repository_impl;
        pub(crate) mod receipt_repository_impl;
    }
}

pub mod domain {
    pub mod entities {
        pub mod admin;
        pub mod device_info;
        pub mod fraud_assessment;
        pub mod purchase_record;
        pub mod rate_limit;
        pub mod receipt_validation;
        pub mod review;
        pub mod transaction;
        pub mod verified_notification;
    }
    pub mod repositories {
        pub mod notification_repository;
        pub mod receipt_repository;
    }
    pub mod services {
        pub mod abuse_detector;
        pub mod admin_gateway;
        pub mod device_risk;
        pub mod fraud_scoring;
        pub mod rate_limiter;
    }
}

pub mod config;
pub(crate) mod constants;
pub mod errors;
pub mod secrets;
pub mod util;
