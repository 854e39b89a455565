use chrono::{Duration, Utc};
use mapbench_core::cache::{entry_file_name, METADATA_FILE};
use mapbench_core::{Answer, EvaluationResult, ModelConfig, Provider, Question, ResultCache, Task};
use tempfile::TempDir;

fn model(id: &str) -> ModelConfig {
    ModelConfig {
        id: id.into(),
        provider: Provider::OpenAi,
        endpoint: Some(format!("openai:{id}")),
        model: None,
        region: None,
        auth: Some("env:OPENAI_API_KEY".into()),
        description: None,
        base_url: None,
    }
}

fn task(id: &str) -> Task {
    Task {
        id: id.into(),
        map_image: format!("{id}.png"),
        context: Some("A city map".into()),
        questions: vec![
            Question {
                text: "Which river?".into(),
                expected: "Seine".into(),
                answer_type: "short_answer".into(),
            },
            Question {
                text: "Capital?".into(),
                expected: "Paris".into(),
                answer_type: "exact_match".into(),
            },
        ],
        task_type: Some("city".into()),
    }
}

fn result(model_id: &str, task_id: &str) -> EvaluationResult {
    EvaluationResult {
        model_id: model_id.into(),
        task_id: task_id.into(),
        timestamp: Utc::now(),
        answers: vec![
            Answer {
                question: "Which river?".into(),
                expected: "Seine".into(),
                model_answer: "The Seine".into(),
                answer_type: "short_answer".into(),
            },
            Answer {
                question: "Capital?".into(),
                expected: "Paris".into(),
                model_answer: "Paris".into(),
                answer_type: "exact_match".into(),
            },
        ],
        raw_response: Some("1. The Seine\n2. Paris".into()),
        error: None,
        execution_time: Some(0.731),
        estimated_cost: Some(0.000_412_5),
        input_tokens: Some(1234),
        output_tokens: Some(17),
    }
}

struct Fixture {
    tmp: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("tasks")).unwrap();
        Self { tmp }
    }

    fn cache_dir(&self) -> std::path::PathBuf {
        self.tmp.path().join("cache")
    }

    fn tasks_dir(&self) -> std::path::PathBuf {
        self.tmp.path().join("tasks")
    }

    async fn open(&self) -> ResultCache {
        ResultCache::open(self.cache_dir(), self.tasks_dir())
            .await
            .unwrap()
    }

    fn metadata(&self) -> serde_json::Value {
        let raw = std::fs::read_to_string(self.cache_dir().join(METADATA_FILE)).unwrap();
        serde_json::from_str(&raw).unwrap()
    }

    fn write_metadata(&self, value: &serde_json::Value) {
        std::fs::write(
            self.cache_dir().join(METADATA_FILE),
            serde_json::to_string_pretty(value).unwrap(),
        )
        .unwrap();
    }
}

#[tokio::test]
async fn round_trip_preserves_every_field() {
    let fx = Fixture::new();
    std::fs::write(fx.tasks_dir().join("t1.png"), b"\x89PNG\r\n").unwrap();
    let cache = fx.open().await;
    let (m, t, r) = (model("gpt-4o"), task("t1"), result("gpt-4o", "t1"));

    cache.put(&m, &t, &r).await.unwrap();
    let back = cache.get(&m, &t).await.unwrap();

    assert_eq!(back, r);
    assert_eq!(back.estimated_cost, Some(0.000_412_5));
    assert_eq!(back.raw_response.as_deref(), Some("1. The Seine\n2. Paris"));
}

#[tokio::test]
async fn metadata_file_has_documented_shape() {
    let fx = Fixture::new();
    let cache = fx.open().await;
    let (m, t) = (model("gpt-4o"), task("t1"));
    cache.put(&m, &t, &result("gpt-4o", "t1")).await.unwrap();

    let meta = fx.metadata();
    assert_eq!(meta["version"], "v2.0");
    assert!(meta["created"].is_string());
    let entries = meta["entries"].as_object().unwrap();
    assert_eq!(entries.len(), 1);
    let (key, entry) = entries.iter().next().unwrap();
    assert_eq!(*key, cache.key_for(&m, &t).await);
    assert_eq!(entry["model_id"], "gpt-4o");
    assert_eq!(entry["task_id"], "t1");
    assert!(entry["file_size"].as_u64().unwrap() > 0);
    assert!(fx.cache_dir().join(entry_file_name(key)).exists());
}

#[tokio::test]
async fn entry_older_than_thirty_days_is_purged() {
    let fx = Fixture::new();
    let (m, t) = (model("gpt-4o"), task("t1"));
    let key = {
        let cache = fx.open().await;
        cache.put(&m, &t, &result("gpt-4o", "t1")).await.unwrap();
        cache.key_for(&m, &t).await
    };

    let mut meta = fx.metadata();
    meta["entries"][&key]["created"] =
        serde_json::json!((Utc::now() - Duration::days(31)).to_rfc3339());
    fx.write_metadata(&meta);

    let cache = fx.open().await;
    assert!(cache.get(&m, &t).await.is_none());
    assert!(cache.entries().await.is_empty());
    assert!(!fx.cache_dir().join(entry_file_name(&key)).exists());
    assert!(fx.metadata()["entries"].as_object().unwrap().is_empty());
}

#[tokio::test]
async fn entry_younger_than_thirty_days_is_served() {
    let fx = Fixture::new();
    let (m, t) = (model("gpt-4o"), task("t1"));
    let key = {
        let cache = fx.open().await;
        cache.put(&m, &t, &result("gpt-4o", "t1")).await.unwrap();
        cache.key_for(&m, &t).await
    };

    let mut meta = fx.metadata();
    meta["entries"][&key]["created"] =
        serde_json::json!((Utc::now() - Duration::days(29)).to_rfc3339());
    fx.write_metadata(&meta);

    assert!(fx.open().await.get(&m, &t).await.is_some());
}

#[tokio::test]
async fn corrupt_payload_is_a_miss_and_is_purged() {
    let fx = Fixture::new();
    let cache = fx.open().await;
    let (m, t) = (model("gpt-4o"), task("t1"));
    cache.put(&m, &t, &result("gpt-4o", "t1")).await.unwrap();

    let path = fx
        .cache_dir()
        .join(entry_file_name(&cache.key_for(&m, &t).await));
    std::fs::write(&path, "{\"model_id\": \"gpt-4o\", \"answers\": [trunc").unwrap();

    assert!(cache.get(&m, &t).await.is_none());
    assert!(!path.exists());
    assert!(cache.entries().await.is_empty());

    // The slot is usable again.
    cache.put(&m, &t, &result("gpt-4o", "t1")).await.unwrap();
    assert!(cache.get(&m, &t).await.is_some());
}

#[tokio::test]
async fn payload_for_another_pair_is_treated_as_corrupt() {
    let fx = Fixture::new();
    let cache = fx.open().await;
    let (m, t) = (model("gpt-4o"), task("t1"));
    cache.put(&m, &t, &result("gpt-4o", "t1")).await.unwrap();

    let path = fx
        .cache_dir()
        .join(entry_file_name(&cache.key_for(&m, &t).await));
    let foreign = serde_json::to_string(&result("gemini", "t7")).unwrap();
    std::fs::write(&path, foreign).unwrap();

    assert!(cache.get(&m, &t).await.is_none());
    assert!(!path.exists());
}

#[tokio::test]
async fn missing_data_file_drops_its_entry() {
    let fx = Fixture::new();
    let cache = fx.open().await;
    let (m, t) = (model("gpt-4o"), task("t1"));
    cache.put(&m, &t, &result("gpt-4o", "t1")).await.unwrap();

    let key = cache.key_for(&m, &t).await;
    std::fs::remove_file(fx.cache_dir().join(entry_file_name(&key))).unwrap();

    assert!(cache.get(&m, &t).await.is_none());
    assert!(!cache.entries().await.contains_key(&key));
}

#[tokio::test]
async fn orphan_data_file_is_never_served() {
    let fx = Fixture::new();
    let cache = fx.open().await;
    let (m, t) = (model("gpt-4o"), task("t1"));

    let key = cache.key_for(&m, &t).await;
    let orphan = fx.cache_dir().join(entry_file_name(&key));
    std::fs::write(&orphan, serde_json::to_string(&result("gpt-4o", "t1")).unwrap()).unwrap();

    assert!(cache.get(&m, &t).await.is_none());
    assert!(!orphan.exists());
}

#[tokio::test]
async fn failed_write_records_no_entry() {
    let fx = Fixture::new();
    let cache = fx.open().await;
    let (m, t) = (model("gpt-4o"), task("t1"));

    std::fs::remove_dir_all(fx.cache_dir()).unwrap();

    assert!(cache.put(&m, &t, &result("gpt-4o", "t1")).await.is_err());
    assert!(cache.entries().await.is_empty());
    assert!(cache.get(&m, &t).await.is_none());
}

#[tokio::test]
async fn content_changes_change_the_key() {
    let fx = Fixture::new();
    let cache = fx.open().await;
    let base_key = cache.key_for(&model("gpt-4o"), &task("t1")).await;

    let mut t = task("t1");
    t.questions[0].text = "Which river flows through?".into();
    assert_ne!(cache.key_for(&model("gpt-4o"), &t).await, base_key);

    let mut t = task("t1");
    t.context = None;
    assert_ne!(cache.key_for(&model("gpt-4o"), &t).await, base_key);

    let mut m = model("gpt-4o");
    m.endpoint = Some("openai:gpt-4o-2024-11-20".into());
    assert_ne!(cache.key_for(&m, &task("t1")).await, base_key);

    std::fs::write(fx.tasks_dir().join("t1.png"), [0u8, 1, 2]).unwrap();
    let with_image = cache.key_for(&model("gpt-4o"), &task("t1")).await;
    assert_ne!(with_image, base_key);
    std::fs::write(fx.tasks_dir().join("t1.png"), [0u8, 1, 3]).unwrap();
    assert_ne!(cache.key_for(&model("gpt-4o"), &task("t1")).await, with_image);

    assert_eq!(
        fx.open().await.key_for(&model("gpt-4o"), &task("t1")).await,
        cache.key_for(&model("gpt-4o"), &task("t1")).await
    );
}

#[tokio::test]
async fn invalidation_by_model_is_scoped_and_counted() {
    let fx = Fixture::new();
    let cache = fx.open().await;
    for (m, t) in [
        ("gpt-x", "t1"),
        ("gpt-x", "t2"),
        ("gpt-x", "t3"),
        ("gemini", "t1"),
        ("gpt-x-mini", "t1"),
    ] {
        cache.put(&model(m), &task(t), &result(m, t)).await.unwrap();
    }

    assert_eq!(cache.invalidate_by_model("gpt-x").await.unwrap(), 3);
    for t in ["t1", "t2", "t3"] {
        assert!(cache.get(&model("gpt-x"), &task(t)).await.is_none());
    }
    assert!(cache.get(&model("gemini"), &task("t1")).await.is_some());
    assert!(cache.get(&model("gpt-x-mini"), &task("t1")).await.is_some());

    let stats = cache.stats().await;
    assert_eq!(stats.entry_count, 2);
    assert!(!stats.by_model.contains_key("gpt-x"));
}
