//config
pub const CONFIG_LOAD_FAILED: &str = "Failed to load configuration from environment";

//api
pub const API_CLIENT_BUILD_FAILED: &str = "Failed to build Twitter API client";

//runs
pub const SWEEP_FAILED: &str = "Retention sweep failed";
pub const BATCH_DELETE_FAILED: &str = "Batch delete from export failed";
