/* Pairing happy path (spec §8 scenario 4): feeding a `RequestSetConfig`
 * response with a fresh device id carries the transceiver through
 * Uninitialised -> Initialising -> Idle -> Pairing -> Paired. */

use std::time::Duration;

use ws28xx_driver::transport::mock::MockTransport;
use ws28xx_driver::transport::{CONFIG_FLASH_PAGE_LEN, FRAME_LENGTH};
use ws28xx_driver::DriverConfig;

fn request_set_config_frame(device_id: u16) -> [u8; FRAME_LENGTH] {
    let mut frame = [0u8; FRAME_LENGTH];
    frame[2] = (FRAME_LENGTH - 3) as u8;
    let id = device_id.to_be_bytes();
    frame[3] = id[0];
    frame[4] = id[1];
    frame[5] = 0xa2; // RequestSetConfig
    frame
}

#[tokio::test(flavor = "multi_thread")]
async fn pairing_happy_path_adopts_device_id() {
    let mock = MockTransport::new();
    mock.set_config_flash_page(0x1f9, [0u8; CONFIG_FLASH_PAGE_LEN]).await;
    mock.set_config_flash_page(0x1f5, [0u8; CONFIG_FLASH_PAGE_LEN]).await;

    mock.push_state(0x16, true).await;
    mock.push_frame(request_set_config_frame(0x012e)).await;
    mock.push_idle_states(100).await;

    let handle = ws28xx_driver::service::spawn(mock, &DriverConfig::default());

    let paired = tokio::time::timeout(Duration::from_secs(2), handle.pair(Duration::from_secs(2)))
        .await
        .expect("pairing must not hang");
    assert!(paired.is_ok());
    assert_eq!(handle.get_transceiver_id(), Some(0x012e));
    assert!(handle.transceiver_is_paired());

    handle.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn pair_times_out_without_a_response() {
    let mock = MockTransport::new();
    mock.set_config_flash_page(0x1f9, [0u8; CONFIG_FLASH_PAGE_LEN]).await;
    mock.set_config_flash_page(0x1f5, [0u8; CONFIG_FLASH_PAGE_LEN]).await;
    mock.push_idle_states(200).await;

    let handle = ws28xx_driver::service::spawn(mock, &DriverConfig::default());
    let result = handle.pair(Duration::from_millis(300)).await;
    assert!(matches!(result, Err(ws28xx_driver::DriverError::Timeout)));

    handle.shutdown().await;
}
