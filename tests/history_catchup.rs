/* Multi-record history catch-up (spec §2 "drains history without
 * loss"): feeds a run of consecutively-indexed History frames through
 * the worker and checks every slot lands in the cache exactly once, in
 * order, with none skipped.
 *
 * A prior off-by-one in `apply_frame`'s `ResponseType::History` arm
 * (storing the post-increment `next_index` into `HistoryProgress`
 * instead of the slot the frame just decoded) made `next_request` skip
 * every other index; this test pins the fix. */

use std::time::Duration;

use ws28xx_driver::codec::history::HistoryRecord;
use ws28xx_driver::codec::Direction;
use ws28xx_driver::transport::mock::MockTransport;
use ws28xx_driver::transport::{CONFIG_FLASH_PAGE_LEN, FRAME_LENGTH};
use ws28xx_driver::DriverConfig;

const DEVICE_ID: u16 = 0x012e;
const RECORD_COUNT: usize = 8;

fn header(frame: &mut [u8; FRAME_LENGTH], device_id: u16, response: u8) {
    frame[2] = (FRAME_LENGTH - 3) as u8;
    let id = device_id.to_be_bytes();
    frame[3] = id[0];
    frame[4] = id[1];
    frame[5] = response;
}

fn current_frame(device_id: u16) -> [u8; FRAME_LENGTH] {
    let mut frame = [0u8; FRAME_LENGTH];
    header(&mut frame, device_id, 0x60);
    frame
}

fn sample_record(minutes_offset: i64) -> HistoryRecord {
    HistoryRecord {
        timestamp: chrono::NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            + chrono::Duration::minutes(minutes_offset),
        temp_indoor_tenths_c: Some(210),
        temp_outdoor_tenths_c: Some(110),
        humidity_indoor_pct: 40,
        humidity_outdoor_pct: 55,
        pressure_rel_hpa_tenths: 10130,
        rain_counter_raw: 0,
        wind_direction: Direction::N,
        gust_direction: Direction::N,
        wind_speed_cms: Some(0),
        gust_speed_cms: Some(0),
    }
}

fn history_frame(device_id: u16, record: &HistoryRecord) -> [u8; FRAME_LENGTH] {
    let mut frame = [0u8; FRAME_LENGTH];
    header(&mut frame, device_id, 0x80);
    let payload = record.encode();
    frame[6..6 + payload.len()].copy_from_slice(&payload);
    frame
}

#[tokio::test(flavor = "multi_thread")]
async fn history_catchup_scans_every_index_without_gaps() {
    let mock = MockTransport::new();

    let mut serial_page = [0u8; CONFIG_FLASH_PAGE_LEN];
    serial_page[7] = (DEVICE_ID >> 8) as u8;
    serial_page[8] = (DEVICE_ID & 0xff) as u8;
    mock.set_config_flash_page(0x1f9, serial_page).await;
    mock.set_config_flash_page(0x1f5, [0u8; CONFIG_FLASH_PAGE_LEN]).await;

    // A couple of leading Current responses, read while the test's
    // StartCachingHistory command is still in flight, so the history
    // frames below are never read before caching is armed.
    for _ in 0..2 {
        mock.push_state(0x16, true).await;
        mock.push_frame(current_frame(DEVICE_ID)).await;
    }

    for i in 0..RECORD_COUNT {
        let record = sample_record(i as i64);
        mock.push_state(0x16, true).await;
        mock.push_frame(history_frame(DEVICE_ID, &record)).await;
    }
    mock.push_idle_states(200).await;

    let config = DriverConfig {
        comm_interval_ms: [5, 5],
        ..Default::default()
    };
    let handle = ws28xx_driver::service::spawn(mock, &config);

    handle.start_caching_history(None, Some(RECORD_COUNT)).await;

    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if handle.get_num_history_scanned().await >= RECORD_COUNT {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("history catch-up must finish well within 5s");

    let records = handle.get_history_cache_records().await;
    assert_eq!(records.len(), RECORD_COUNT);
    for (i, rec) in records.iter().enumerate() {
        assert_eq!(
            rec.record_index, i as u16,
            "history slot {i} was skipped or duplicated"
        );
    }

    handle.shutdown().await;
}
