mod handlers;
mod types;

pub use handlers::{deactivate_device, get_device, list_devices, register_device};
pub use types::{DeviceDetailResponse, DeviceResponse, Location};

// Re-export utoipa path structs for OpenAPI documentation
pub use handlers::{
    __path_deactivate_device, __path_get_device, __path_list_devices, __path_register_device,
};
