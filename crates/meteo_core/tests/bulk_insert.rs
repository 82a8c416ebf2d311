use meteo_core::{
    ChangeNotifier, ContentValues, LocationEntry, ProviderError, Store, StoreOptions,
    WeatherEntry, WeatherProvider,
};
use rusqlite::types::Value;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

const TEST_DATE: i64 = 1_459_641_600;
const DAY: i64 = 86_400;
const BULK_INSERT_RECORDS_TO_INSERT: i64 = 10;

fn location_values() -> ContentValues {
    ContentValues::new()
        .with(LocationEntry::COLUMN_LOCATION_SETTING, "99705".to_string())
        .with(LocationEntry::COLUMN_CITY_NAME, "North Pole".to_string())
        .with(LocationEntry::COLUMN_COORD_LAT, 64.7488)
        .with(LocationEntry::COLUMN_COORD_LONG, -147.353)
}

fn weather_rows(location_id: i64, count: i64) -> Vec<ContentValues> {
    weather_rows_from(location_id, 0, count)
}

fn weather_rows_from(location_id: i64, first_day: i64, count: i64) -> Vec<ContentValues> {
    (first_day..first_day + count)
        .map(|offset| {
            ContentValues::new()
                .with(WeatherEntry::COLUMN_LOC_KEY, location_id)
                .with(WeatherEntry::COLUMN_DATE, TEST_DATE + offset * DAY)
                .with(WeatherEntry::COLUMN_SHORT_DESC, "Asteroids".to_string())
                .with(WeatherEntry::COLUMN_WEATHER_ID, 321_i64)
                .with(WeatherEntry::COLUMN_MIN_TEMP, 65.0 - offset as f64)
                .with(WeatherEntry::COLUMN_MAX_TEMP, 75.0 + offset as f64)
                .with(WeatherEntry::COLUMN_HUMIDITY, 1.2)
                .with(WeatherEntry::COLUMN_PRESSURE, 1.3 / offset.max(1) as f64)
                .with(WeatherEntry::COLUMN_WIND_SPEED, 5.5 + 0.2 * offset as f64)
                .with(WeatherEntry::COLUMN_DEGREES, 1.1)
        })
        .collect()
}

fn setup() -> (WeatherProvider, i64) {
    let provider = WeatherProvider::new(Store::open_in_memory().unwrap(), ChangeNotifier::new());
    let row = provider
        .insert(&LocationEntry::content_uri(), &location_values())
        .unwrap();
    let location_id = row.segments().last().unwrap().parse().unwrap();
    (provider, location_id)
}

fn weather_count(provider: &WeatherProvider) -> usize {
    provider
        .query(&WeatherEntry::content_uri(), None, None, &[], None)
        .unwrap()
        .count()
}

#[test]
fn bulk_insert_writes_every_row_in_order() {
    let (provider, location_id) = setup();
    let rows = weather_rows(location_id, BULK_INSERT_RECORDS_TO_INSERT);

    let inserted = provider
        .bulk_insert(&WeatherEntry::content_uri(), &rows)
        .unwrap();
    assert_eq!(inserted, rows.len());

    let mut cursor = provider
        .query(
            &WeatherEntry::content_uri(),
            None,
            None,
            &[],
            Some("date ASC"),
        )
        .unwrap();
    assert_eq!(cursor.count(), rows.len());
    let mut offset = 0;
    while cursor.move_to_next() {
        assert_eq!(
            cursor.get_i64(WeatherEntry::COLUMN_DATE).unwrap(),
            TEST_DATE + offset * DAY
        );
        assert_eq!(
            cursor.get_f64(WeatherEntry::COLUMN_MAX_TEMP).unwrap(),
            75.0 + offset as f64
        );
        offset += 1;
    }
}

#[test]
fn bulk_insert_replaces_rows_for_same_day_and_location() {
    let (provider, location_id) = setup();
    let rows = weather_rows(location_id, 3);

    assert_eq!(
        provider
            .bulk_insert(&WeatherEntry::content_uri(), &rows)
            .unwrap(),
        3
    );
    let shifted: Vec<ContentValues> = rows
        .iter()
        .map(|values| {
            let date = values.get_i64(WeatherEntry::COLUMN_DATE).unwrap();
            values
                .clone()
                .with(WeatherEntry::COLUMN_DATE, date + 3_600)
                .with(WeatherEntry::COLUMN_SHORT_DESC, "Clear".to_string())
        })
        .collect();
    assert_eq!(
        provider
            .bulk_insert(&WeatherEntry::content_uri(), &shifted)
            .unwrap(),
        3
    );

    let mut cursor = provider
        .query(
            &WeatherEntry::content_uri(),
            None,
            Some("short_desc = ?"),
            &[Value::Text("Clear".to_string())],
            None,
        )
        .unwrap();
    assert_eq!(cursor.count(), 3);
    assert_eq!(weather_count(&provider), 3);
    assert!(cursor.move_to_first());
}

#[test]
fn failing_row_rolls_back_whole_batch() {
    let (provider, location_id) = setup();
    let mut rows = weather_rows(location_id, 5);
    rows[3].put(WeatherEntry::COLUMN_LOC_KEY, location_id + 1_000);

    let err = provider
        .bulk_insert(&WeatherEntry::content_uri(), &rows)
        .unwrap_err();

    assert!(matches!(err, ProviderError::StorageFailure(_)));
    assert!(err.is_retryable());
    assert_eq!(weather_count(&provider), 0);

    let inserted = provider
        .bulk_insert(&WeatherEntry::content_uri(), &rows[..3])
        .unwrap();
    assert_eq!(inserted, 3);
}

#[test]
fn failed_batch_does_not_notify() {
    let (provider, location_id) = setup();
    let hits = Arc::new(AtomicUsize::new(0));
    let sink = Arc::clone(&hits);
    let _subscription =
        provider
            .notifier()
            .register(&WeatherEntry::content_uri(), true, move |_| {
                sink.fetch_add(1, Ordering::SeqCst);
            });

    let mut rows = weather_rows(location_id, 2);
    rows[1].put(WeatherEntry::COLUMN_LOC_KEY, location_id + 1_000);
    assert!(provider
        .bulk_insert(&WeatherEntry::content_uri(), &rows)
        .is_err());
    assert_eq!(hits.load(Ordering::SeqCst), 0);

    provider
        .bulk_insert(&WeatherEntry::content_uri(), &rows[..1])
        .unwrap();
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[test]
fn empty_batch_writes_nothing_and_stays_silent() {
    let (provider, _) = setup();
    let hits = Arc::new(AtomicUsize::new(0));
    let sink = Arc::clone(&hits);
    let _subscription =
        provider
            .notifier()
            .register(&WeatherEntry::content_uri(), false, move |_| {
                sink.fetch_add(1, Ordering::SeqCst);
            });

    assert_eq!(
        provider
            .bulk_insert(&WeatherEntry::content_uri(), &[])
            .unwrap(),
        0
    );
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[test]
fn bulk_insert_outside_weather_table_is_unsupported() {
    let (provider, location_id) = setup();

    for path in [
        LocationEntry::content_uri(),
        WeatherEntry::build_weather_location("99705"),
        WeatherEntry::build_weather_location_with_date("99705", TEST_DATE),
    ] {
        let err = provider
            .bulk_insert(&path, &weather_rows(location_id, 1))
            .unwrap_err();
        assert!(
            matches!(err, ProviderError::UnsupportedBulkTarget(_)),
            "{path}: {err}"
        );
    }
    assert_eq!(weather_count(&provider), 0);
}

#[test]
fn file_store_batch_is_visible_to_readers() {
    let dir = tempfile::tempdir().unwrap();
    let store = Store::open(&StoreOptions::file(dir.path().join("bulk.db"))).unwrap();
    let provider = WeatherProvider::new(store, ChangeNotifier::new());
    let row = provider
        .insert(&LocationEntry::content_uri(), &location_values())
        .unwrap();
    let location_id: i64 = row.segments().last().unwrap().parse().unwrap();

    let inserted = provider
        .bulk_insert(&WeatherEntry::content_uri(), &weather_rows(location_id, 4))
        .unwrap();

    assert_eq!(inserted, 4);
    assert_eq!(weather_count(&provider), 4);
}

#[test]
fn readers_never_see_part_of_a_batch_while_single_inserts_interleave() {
    const BATCHES: i64 = 20;
    const SINGLE_INSERTS: i64 = 60;

    let dir = tempfile::tempdir().unwrap();
    let store = Store::open(&StoreOptions::file(dir.path().join("interleave.db"))).unwrap();
    let provider = Arc::new(WeatherProvider::new(store, ChangeNotifier::new()));
    let batch_location = provider
        .insert(&LocationEntry::content_uri(), &location_values())
        .unwrap();
    let batch_location_id: i64 = batch_location.segments().last().unwrap().parse().unwrap();
    let single_location_id: i64 = provider
        .insert(
            &LocationEntry::content_uri(),
            &location_values().with(LocationEntry::COLUMN_LOCATION_SETTING, "94043".to_string()),
        )
        .unwrap()
        .segments()
        .last()
        .unwrap()
        .parse()
        .unwrap();

    let barrier = Arc::new(Barrier::new(3));
    let writers_done = Arc::new(AtomicBool::new(false));

    let bulk = {
        let provider = Arc::clone(&provider);
        let barrier = Arc::clone(&barrier);
        thread::spawn(move || {
            barrier.wait();
            for batch in 0..BATCHES {
                let rows = weather_rows_from(
                    batch_location_id,
                    batch * BULK_INSERT_RECORDS_TO_INSERT,
                    BULK_INSERT_RECORDS_TO_INSERT,
                );
                provider
                    .bulk_insert(&WeatherEntry::content_uri(), &rows)
                    .unwrap();
            }
        })
    };
    let single = {
        let provider = Arc::clone(&provider);
        let barrier = Arc::clone(&barrier);
        thread::spawn(move || {
            barrier.wait();
            for day in 0..SINGLE_INSERTS {
                let row = weather_rows_from(single_location_id, day, 1).remove(0);
                provider.insert(&WeatherEntry::content_uri(), &row).unwrap();
            }
        })
    };
    let reader = {
        let provider = Arc::clone(&provider);
        let barrier = Arc::clone(&barrier);
        let writers_done = Arc::clone(&writers_done);
        thread::spawn(move || {
            barrier.wait();
            let batch_path = WeatherEntry::build_weather_location("99705");
            let mut observed = Vec::new();
            loop {
                let done = writers_done.load(Ordering::SeqCst);
                let visible = provider
                    .query(&batch_path, None, None, &[], None)
                    .unwrap()
                    .count();
                observed.push(visible);
                if done {
                    return observed;
                }
            }
        })
    };

    bulk.join().unwrap();
    single.join().unwrap();
    writers_done.store(true, Ordering::SeqCst);
    let observed = reader.join().unwrap();

    let batch_size = BULK_INSERT_RECORDS_TO_INSERT as usize;
    for visible in &observed {
        assert_eq!(visible % batch_size, 0, "partial batch visible: {visible} rows");
    }
    assert_eq!(observed.last().copied(), Some(BATCHES as usize * batch_size));
    assert_eq!(
        weather_count(&provider),
        (BATCHES * BULK_INSERT_RECORDS_TO_INSERT + SINGLE_INSERTS) as usize
    );
}
