//! Command line and environment binding of [`ServiceConfig`].

use fieldx::fxstruct;

use crate::lookup::DEFAULT_HOME_REGION;
use crate::pool::DEFAULT_WORKERS;
use crate::service::ServiceConfig;
use crate::staging::DEFAULT_SLOTS;

/// Flatten into a host's own `clap::Parser` to expose the service sizing.
#[derive(Debug, Clone, clap::Args)]
#[fxstruct(no_new, get(copy))]
pub struct ServiceArgs {
    /// Number of lookup workers, 1 to 20. Anything else falls back to 10.
    #[clap(long, env = "PLATE_LOOKUP_WORKERS", default_value_t = DEFAULT_WORKERS)]
    workers: usize,

    /// Staging slots for cache refills.
    #[clap(long, env = "PLATE_LOOKUP_CAR_SLOTS", default_value_t = DEFAULT_SLOTS)]
    car_slots: usize,

    /// Staging slots for unrecognized plates.
    #[clap(long, env = "PLATE_LOOKUP_NEW_PLATE_SLOTS", default_value_t = DEFAULT_SLOTS)]
    new_plate_slots: usize,

    /// Plates starting with this prefix are looked up in the central store on a local miss.
    #[fieldx(get(clone))]
    #[clap(long, env = "PLATE_LOOKUP_HOME_REGION", default_value = DEFAULT_HOME_REGION)]
    home_region: String,
}

impl ServiceArgs {
    pub fn into_config(self) -> ServiceConfig {
        ServiceConfig::builder()
            .workers(self.workers)
            .car_slots(self.car_slots)
            .new_plate_slots(self.new_plate_slots)
            .home_region(self.home_region)
            .build()
            .expect("remaining service config fields have defaults")
    }
}
