pub mod parameter_store;

pub use parameter_store::{
    mapping_record_id, ParameterStore, ParameterStoreError, PARAMETER_NAMESPACE,
};
