use std::fs;
use std::path::Path;
use std::sync::Arc;

use craft_ingest::config::Settings;
use craft_ingest::ingest::{InMemoryObjectStore, ObjectStore};
use craft_ingest::pipeline::Pipeline;
use tempfile::tempdir;

const BUCKET: &str = "test_bucket";

const LANDER_SATURN: &str = "id,size,core,SPEED,force,clones
f0388371-7285-449c-be70-277db541ac86,600,1.5,2,3,4
8a1e2b3c-1111-0a0b-9999-000000000001,120,0.5,10.25,1,0
8a1e2b3c-1111-ffff-9999-000000000002,7,2,3,4,5
";

const LANDER_VENUS: &str = "id,size,coRe,suspension,thrust,weight,crew
f0388371-7285-449c-be70-277db541ac86,75,1,2,3,4,5
f0388371-7285-0001-be70-277db541ac86,0,1,2,3,4,5
f0388371-7285-abcd-be70-277db541ac86,999,1,2,3,4,6
";

const ROCKET_SATURN: &str = "id,size,Mass,gravity,temperature,life
f0388371-7285-449c-be70-277db541ac86,500,1,9.8,-40,yes
f0388371-7285-1234-be70-277db541ac86,49,2,3.7,15,no
f0388371-7285-5678-be70-277db541ac86,abc,3,1.6,-170,true
";

const ROCKET_VENUS: &str = "id,size,speed,axis_ANGLE
f0388371-7285-449c-be70-277db541ac86,75,1,0.5
f0388371-7285-0a0a-be70-277db541ac86,300,2.5,90
f0388371-7285-0b0b-be70-277db541ac86,1000,3,180
";

fn seeded_store() -> InMemoryObjectStore {
    let store = InMemoryObjectStore::new();
    store.insert(BUCKET, "lander_saturn_20210301_013306.csv", LANDER_SATURN);
    store.insert(BUCKET, "lander_venus_20210302_101010.csv", LANDER_VENUS);
    store.insert(BUCKET, "rocket_saturn_20210301_121033.csv", ROCKET_SATURN);
    store.insert(BUCKET, "rocket_venus_20210308_035720.csv", ROCKET_VENUS);
    store
}

fn settings(output_dir: &Path, workers: usize) -> Settings {
    Settings {
        bucket: BUCKET.to_string(),
        output_dir: output_dir.to_path_buf(),
        workers,
        ..Settings::default()
    }
}

fn read_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

#[tokio::test]
async fn test_one_file_per_craft_type() {
    let dir = tempdir().unwrap();
    let store: Arc<dyn ObjectStore> = Arc::new(seeded_store());

    let result = Pipeline::new(store, settings(dir.path(), 4)).run().await.unwrap();

    assert_eq!(result.objects_listed, 4);
    assert_eq!(result.records_validated, 12);
    assert_eq!(result.rows_rejected, 0);
    assert_eq!(result.files_written.len(), 4);

    let summary = serde_json::to_value(&result).unwrap();
    assert_eq!(summary["records_validated"], 12);
    assert_eq!(summary["unrecognized_files"], serde_json::json!([]));

    for name in ["LanderSaturn", "LanderVenus", "RocketSaturn", "RocketVenus"] {
        let lines = read_lines(&dir.path().join(format!("{}.csv", name)));
        assert_eq!(lines.len(), 4, "{} should have a header and 3 rows", name);
    }

    let saturn = read_lines(&dir.path().join("LanderSaturn.csv"));
    assert_eq!(saturn[0], "id,magnitude,timestamp,core,speed,force,clones");
    assert!(saturn.contains(&"449c,massive,2021-03-01 01:33:06,1.5,2.0,3.0,4".to_string()));

    let rocket = read_lines(&dir.path().join("RocketSaturn.csv"));
    assert_eq!(rocket[0], "id,magnitude,timestamp,mass,gravity,temperature,life");
    assert!(rocket.contains(&"5678,N/A,2021-03-01 12:10:33,3.0,1.6,-170.0,true".to_string()));
}

#[tokio::test]
async fn test_bad_objects_do_not_stop_the_run() {
    let dir = tempdir().unwrap();
    let store = seeded_store();
    store.insert_failing(BUCKET, "rocket_venus_20210309_000000.csv", "connection reset");
    store.insert(BUCKET, "unknown_file.csv", "id,size\nf0388371-7285-449c-be70-277db541ac86,1\n");
    store.insert(
        BUCKET,
        "lander_venus_20210303_000000.csv",
        "id,size,coRe,suspension,thrust,weight,crew,extra\nf0388371-7285-449c-be70-277db541ac86,75,1,2,3,4,5,oops\n",
    );

    let store: Arc<dyn ObjectStore> = Arc::new(store);
    let result = Pipeline::new(store, settings(dir.path(), 2)).run().await.unwrap();

    assert_eq!(result.objects_listed, 7);
    assert_eq!(result.fetch_failures, 1);
    assert_eq!(result.unrecognized_batches, 1);
    assert_eq!(result.unrecognized_files, vec!["unknown_file.csv".to_string()]);
    assert_eq!(result.rows_rejected, 1);
    assert_eq!(result.records_validated, 12);
    assert_eq!(read_lines(&dir.path().join("RocketVenus.csv")).len(), 4);
    assert_eq!(read_lines(&dir.path().join("LanderVenus.csv")).len(), 4);
}

#[tokio::test]
async fn test_missing_kind_writes_no_file() {
    let dir = tempdir().unwrap();
    let store = InMemoryObjectStore::new();
    store.insert(BUCKET, "rocket_venus_20210308_035720.csv", ROCKET_VENUS);

    let store: Arc<dyn ObjectStore> = Arc::new(store);
    let result = Pipeline::new(store, settings(dir.path(), 1)).run().await.unwrap();

    assert_eq!(result.files_written, vec![dir.path().join("RocketVenus.csv")]);
    assert!(!dir.path().join("LanderSaturn.csv").exists());
}

#[tokio::test]
async fn test_output_independent_of_worker_count_and_row_order() {
    let reversed: String = {
        let mut lines: Vec<&str> = LANDER_SATURN.lines().collect();
        lines[1..].reverse();
        lines.join("\n") + "\n"
    };

    let first = tempdir().unwrap();
    let store: Arc<dyn ObjectStore> = Arc::new(seeded_store());
    Pipeline::new(store, settings(first.path(), 1)).run().await.unwrap();

    let second = tempdir().unwrap();
    let store = seeded_store();
    store.insert(BUCKET, "lander_saturn_20210301_013306.csv", reversed);
    let store: Arc<dyn ObjectStore> = Arc::new(store);
    Pipeline::new(store, settings(second.path(), 8)).run().await.unwrap();

    for name in ["LanderSaturn", "LanderVenus", "RocketSaturn", "RocketVenus"] {
        let file = format!("{}.csv", name);
        assert_eq!(
            fs::read(first.path().join(&file)).unwrap(),
            fs::read(second.path().join(&file)).unwrap(),
            "{} differs between runs",
            name
        );
    }
}

#[tokio::test]
async fn test_rerun_overwrites_with_same_content() {
    let dir = tempdir().unwrap();
    let store: Arc<dyn ObjectStore> = Arc::new(seeded_store());
    let pipeline = Pipeline::new(store, settings(dir.path(), 3));

    pipeline.run().await.unwrap();
    let before = fs::read(dir.path().join("RocketVenus.csv")).unwrap();
    pipeline.run().await.unwrap();
    let after = fs::read(dir.path().join("RocketVenus.csv")).unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_listing_failure_is_fatal() {
    let dir = tempdir().unwrap();
    let store: Arc<dyn ObjectStore> = Arc::new(InMemoryObjectStore::new());
    let result = Pipeline::new(store, settings(dir.path(), 1)).run().await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_unwritable_output_dir_is_fatal() {
    let dir = tempdir().unwrap();
    let blocker = dir.path().join("not_a_dir");
    fs::write(&blocker, "file").unwrap();

    let store: Arc<dyn ObjectStore> = Arc::new(seeded_store());
    let result = Pipeline::new(store, settings(&blocker, 1)).run().await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_max_results_limits_listing() {
    let dir = tempdir().unwrap();
    let store: Arc<dyn ObjectStore> = Arc::new(seeded_store());
    let mut limited = settings(dir.path(), 2);
    limited.max_results = Some(2);

    let result = Pipeline::new(store, limited).run().await.unwrap();
    assert_eq!(result.objects_listed, 2);
    assert_eq!(result.files_written.len(), 2);
}
