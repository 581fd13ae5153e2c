//! Response builders, one per supported operation.

pub mod blob;
pub mod capabilities;
pub mod feature_info;
pub mod property_value;
pub mod resource;

pub use blob::BlobHandler;
pub use feature_info::FeatureInfoHandler;
pub use property_value::PropertyValueHandler;
pub use resource::ResourceHandler;
