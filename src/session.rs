use tracing::debug;

use crate::driver::Driver;
use crate::error::Result;

/// Owns a connected driver for the length of a run and disconnects it exactly
/// once, either through [`release`](DriverSession::release) or on drop, so
/// every exit path gives the connection back.
pub struct DriverSession<D: Driver> {
    driver: D,
    released: bool,
}

impl<D: Driver> DriverSession<D> {
    pub fn new(driver: D) -> Self {
        Self {
            driver,
            released: false,
        }
    }

    pub fn driver(&mut self) -> &mut D {
        &mut self.driver
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Drop the open statement and the connection. Later calls do nothing.
    pub fn release(&mut self) -> Result<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        self.driver.disconnect()
    }
}

impl<D: Driver> Drop for DriverSession<D> {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            debug!("Disconnect failed: {e}");
        }
    }
}
