use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio_test::{assert_err, assert_ok};

use writing_crew::error::{Error, ErrorKind};
use writing_crew::providers::{GenerativeModel, ModelConnector};
use writing_crew::request::{CallOptions, GenerateContentRequest};
use writing_crew::safety::{HarmBlockThreshold, HarmCategory, SafetyPolicy};
use writing_crew::writing::{save_article, Language, PREVIEW_CHARS};
use writing_crew::{
  Agent, Crew, GeminiLlm, LanguageModel, Process, Prompt, Settings, Task,
  Turn, WritingAssistantCrew
};

// ===== Fakes =====

/// Shared record of everything the fake model saw
#[derive(Default)]
struct Recorder
{   connects: AtomicUsize
  , connected_names: Mutex<Vec<String>>
  , requests: Mutex<Vec<GenerateContentRequest>>
  , replies: Mutex<VecDeque<Result<Value, Error>>>
}

impl Recorder
{   fn with_replies(replies: Vec<Result<Value, Error>>) -> Arc<Self>
    {   let recorder = Recorder::default();
        *recorder.replies.lock().unwrap() = replies.into();
        Arc::new(recorder)
    }

    fn requests(&self) -> Vec<GenerateContentRequest>
    {   self.requests.lock().unwrap().clone()
    }
}

struct FakeConnector
{   recorder: Arc<Recorder>
}

impl ModelConnector for FakeConnector
{   type Model = FakeModel;

    fn connect(&self, model_name: &str) -> Result<FakeModel, Error>
    {   self.recorder.connects.fetch_add(1, Ordering::SeqCst);
        self.recorder.connected_names.lock().unwrap()
          .push(model_name.to_string());
        Ok(FakeModel
        {   name: model_name.to_string()
          , recorder: self.recorder.clone()
        })
    }
}

struct FakeModel
{   name: String
  , recorder: Arc<Recorder>
}

#[async_trait]
impl GenerativeModel for FakeModel
{   fn model_name(&self) -> &str
    {   &self.name
    }

    async fn generate_content(
      &self
    , request: &GenerateContentRequest
    ) -> Result<Value, Error>
    {   self.recorder.requests.lock().unwrap().push(request.clone());
        self.recorder.replies.lock().unwrap()
          .pop_front()
          .unwrap_or_else(|| Ok(json!({})))
    }
}

fn fake_llm(replies: Vec<Result<Value, Error>>)
  -> (GeminiLlm<FakeConnector>, Arc<Recorder>)
{   let recorder = Recorder::with_replies(replies);
    let llm = GeminiLlm::new(
      FakeConnector { recorder: recorder.clone() }
    , "models/gemini-2.0-flash-lite"
    );
    (llm, recorder)
}

fn candidate(text: &str) -> Value
{   json!({"candidates": [{"content": {"role": "model", "parts": [{"text": text}]}}]})
}

fn options(value: Value) -> CallOptions
{   value.as_object().cloned().unwrap_or_default()
}

// ===== Adapter =====

#[tokio::test]
async fn test_complete_forwards_only_recognized_options()
{   let (llm, recorder) = fake_llm(vec![Ok(candidate("ok"))]);
    let opts = options(json!({
      "temperature": 0.2,
      "max_output_tokens": 512,
      "top_p": 0.5,
      "top_k": 10,
      "stop": ["END"],
      "stream": true,
      "callbacks": ["handler"],
      "frequency_penalty": 1.0
    }));

    let text = assert_ok!(llm.complete(&[Turn::user("hi")], &opts).await);
    assert_eq!(text, "ok");

    let config = serde_json::to_value(
      &recorder.requests()[0].generation_config
    ).unwrap();
    assert_eq!(config, json!({
      "temperature": 0.2,
      "maxOutputTokens": 512,
      "topP": 0.5,
      "topK": 10,
      "stopSequences": ["END"]
    }));
}

#[tokio::test]
async fn test_summarize_example_forwards_defaults()
{   let (llm, recorder) = fake_llm(vec![Ok(candidate("summary"))]);
    let turns: Vec<Turn> = serde_json::from_value(
      json!([{"role": "user", "content": "Summarize X"}])
    ).unwrap();
    let opts = options(json!({"temperature": 0.7, "stream": false, "foo": "bar"}));

    assert_ok!(llm.complete(&turns, &opts).await);

    let request = serde_json::to_value(&recorder.requests()[0]).unwrap();
    assert_eq!(request["generationConfig"], json!({
      "temperature": 0.7,
      "maxOutputTokens": 2048,
      "topP": 0.95,
      "topK": 40
    }));
    assert_eq!(request["contents"], json!([
      {"role": "user", "parts": [{"text": "Summarize X"}]}
    ]));
    assert!(request.get("systemInstruction").is_none());
}

#[tokio::test]
async fn test_direct_text_returned_unchanged()
{   let (llm, _) = fake_llm(vec![Ok(json!({"text": "  exact text\n"}))]);
    let text = assert_ok!(
      llm.complete(&[Turn::user("x")], &CallOptions::new()).await
    );
    assert_eq!(text, "  exact text\n");
}

#[tokio::test]
async fn test_first_candidate_text_returned()
{   let (llm, _) = fake_llm(vec![Ok(json!({
      "candidates": [
        {"content": {"parts": [{"text": "first"}]}},
        {"content": {"parts": [{"text": "second"}]}}
      ]
    }))]);
    let text = assert_ok!(
      llm.complete(&[Turn::user("x")], &CallOptions::new()).await
    );
    assert_eq!(text, "first");
}

#[tokio::test]
async fn test_unknown_response_shape_yields_empty_string()
{   let (llm, _) = fake_llm(vec![Ok(json!({"usageMetadata": {"totalTokenCount": 3}}))]);
    let text = assert_ok!(
      llm.complete(&[Turn::user("x")], &CallOptions::new()).await
    );
    assert_eq!(text, "");
}

#[tokio::test]
async fn test_generation_failure_propagates_unchanged()
{   let failure = Error::HttpError(
      "error sending request: connection refused".to_string()
    );
    let (llm, _) = fake_llm(vec![Err(failure.clone())]);

    let err = assert_err!(
      llm.call(Prompt::from("hello"), None, &CallOptions::new()).await
    );
    assert_eq!(err, failure);
    assert_eq!(err.kind(), ErrorKind::Generation);
    assert!(err.to_string().contains("connection refused"));
}

#[tokio::test]
async fn test_model_handle_created_once_with_prefix_stripped()
{   let (llm, recorder) = fake_llm(vec![
      Ok(candidate("a"))
    , Ok(candidate("b"))
    , Ok(candidate("c"))
    ]);
    assert_eq!(llm.model_name(), "gemini-2.0-flash-lite");
    assert_eq!(recorder.connects.load(Ordering::SeqCst), 0);

    for _ in 0..3
    {   assert_ok!(llm.call(Prompt::from("x"), None, &CallOptions::new()).await);
    }

    assert_eq!(recorder.connects.load(Ordering::SeqCst), 1);
    assert_eq!(
      *recorder.connected_names.lock().unwrap()
    , vec!["gemini-2.0-flash-lite".to_string()]
    );
}

#[tokio::test]
async fn test_every_request_carries_safety_policy()
{   let (llm, recorder) = fake_llm(vec![]);
    assert_eq!(llm.safety_policy(), &SafetyPolicy::permissive());
    assert_ok!(llm.call(Prompt::from("x"), None, &CallOptions::new()).await);
    assert_eq!(
      recorder.requests()[0].safety_settings
    , SafetyPolicy::permissive().settings
    );

    let strict = SafetyPolicy::uniform(HarmBlockThreshold::BlockLowAndAbove);
    let (llm, recorder) = fake_llm(vec![]);
    let llm = llm.with_safety_policy(strict.clone());
    assert_eq!(llm.safety_policy(), &strict);
    assert_ok!(llm.call(Prompt::from("x"), None, &CallOptions::new()).await);
    let requests = recorder.requests();
    let sent = &requests[0].safety_settings;
    assert_eq!(sent, &strict.settings);
    assert!(sent.iter().any(|s| s.category == HarmCategory::HateSpeech));
}

#[tokio::test]
async fn test_call_prompt_shapes_and_stop()
{   let (llm, recorder) = fake_llm(vec![]);
    let parts = vec!["part one".to_string(), "part two".to_string()];
    let opts = options(json!({"max_tokens": 100, "stop": ["ignored"]}));

    assert_ok!(
      llm.call(Prompt::from(parts), Some(vec!["STOP".to_string()]), &opts).await
    );

    let request = serde_json::to_value(&recorder.requests()[0]).unwrap();
    assert_eq!(request["contents"], json!([
      {"role": "user", "parts": [{"text": "part one"}, {"text": "part two"}]}
    ]));
    assert_eq!(request["generationConfig"]["maxOutputTokens"], 100);
    assert_eq!(request["generationConfig"]["stopSequences"], json!(["STOP"]));
}

#[tokio::test]
async fn test_turns_map_roles()
{   let (llm, recorder) = fake_llm(vec![]);
    let turns = vec![
      Turn::system("be brief")
    , Turn::user("question")
    , Turn::assistant("answer")
    , Turn::user("follow-up")
    ];

    assert_ok!(llm.complete(&turns, &CallOptions::new()).await);

    let request = serde_json::to_value(&recorder.requests()[0]).unwrap();
    assert_eq!(
      request["systemInstruction"]
    , json!({"parts": [{"text": "be brief"}]})
    );
    let roles: Vec<&str> = request["contents"].as_array().unwrap()
      .iter()
      .map(|c| c["role"].as_str().unwrap())
      .collect();
    assert_eq!(roles, vec!["user", "model", "user"]);
}

#[tokio::test]
async fn test_out_of_range_params_are_clamped()
{   let (llm, recorder) = fake_llm(vec![]);
    let opts = options(json!({
      "temperature": 3.5, "top_p": -1.0, "top_k": 0, "max_output_tokens": "lots"
    }));

    assert_ok!(llm.complete(&[Turn::user("x")], &opts).await);

    let requests = recorder.requests();
    let config = &requests[0].generation_config;
    assert_eq!(config.temperature, 2.0);
    assert_eq!(config.top_p, 0.0);
    assert_eq!(config.top_k, 1);
    assert_eq!(config.max_output_tokens, 2048);
}

// ===== Configuration =====

#[test]
fn test_missing_credential_is_configuration_error()
{   let err = assert_err!(Settings::from_lookup(|_| None));
    assert_eq!(err, Error::MissingApiKey("GEMINI_API_KEY".to_string()));
    assert!(err.is_configuration());

    let err = assert_err!(Settings::from_lookup(|key| match key
    {   "GEMINI_API_KEY" => Some("   ".to_string())
      , _ => None
    }));
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[test]
fn test_settings_defaults_and_overrides()
{   let settings = assert_ok!(Settings::from_lookup(|key| match key
    {   "GEMINI_API_KEY" => Some("secret".to_string())
      , _ => None
    }));
    assert_eq!(settings.api_key, "secret");
    assert_eq!(settings.model, "gemini-2.0-flash-lite");
    assert_eq!(
      settings.api_base
    , "https://generativelanguage.googleapis.com/v1beta"
    );

    let settings = assert_ok!(Settings::from_lookup(|key| match key
    {   "GEMINI_API_KEY" => Some("secret".to_string())
      , "GEMINI_MODEL" => Some("models/gemini-1.5-pro".to_string())
      , _ => None
    }));
    let llm = GeminiLlm::from_settings(&settings);
    assert_eq!(llm.model_name(), "gemini-1.5-pro");
}

// ===== Crew =====

fn agent(role: &str) -> Agent
{   Agent::new(role, format!("{} goal", role), format!("{} backstory", role))
}

#[tokio::test]
async fn test_crew_runs_tasks_in_order_with_context()
{   let (llm, recorder) = fake_llm(vec![
      Ok(candidate("notes"))
    , Ok(candidate("draft"))
    ]);
    let (a, b) = (agent("Alpha"), agent("Beta"));
    let crew = Crew::new(
      vec![a.clone(), b.clone()]
    , vec![
        Task::new("collect notes", "some notes", a)
      , Task::new("write draft", "a draft", b)
      ]
    , Process::Sequential
    );

    let output = assert_ok!(crew.kickoff(&llm).await);
    assert_eq!(output.raw, "draft");
    assert_eq!(output.to_string(), "draft");
    assert_eq!(output.tasks_output.len(), 2);
    assert_eq!(output.tasks_output[0].agent, "Alpha");
    assert_eq!(output.tasks_output[0].raw, "notes");

    let requests = recorder.requests();
    let first = &requests[0];
    let second = &requests[1];
    assert!(first.system_instruction.as_ref().unwrap().parts[0].text
      .starts_with("You are Alpha."));
    assert!(!first.contents[0].parts[0].text.contains("context"));
    assert!(!second.contents[0].parts[0].text.contains("collect notes"));
    assert!(second.contents[0].parts[0].text.contains("write draft"));
    assert!(second.contents[0].parts[0].text.contains("notes"));
    assert!(second.contents[0].parts[0].text
      .contains("This is the context you're working with"));
}

#[tokio::test]
async fn test_crew_stops_at_first_failure()
{   let failure = Error::RateLimitExceeded("quota".to_string());
    let (llm, recorder) = fake_llm(vec![Err(failure.clone())]);
    let a = agent("Alpha");
    let crew = Crew::new(
      vec![a.clone()]
    , vec![
        Task::new("one", "x", a.clone())
      , Task::new("two", "y", a)
      ]
    , Process::Sequential
    );

    let err = assert_err!(crew.kickoff(&llm).await);
    assert_eq!(err, failure);
    assert_eq!(recorder.requests().len(), 1);
}

#[tokio::test]
async fn test_crew_rejects_bad_configuration()
{   let (llm, recorder) = fake_llm(vec![]);

    let empty = Crew::new(vec![agent("Alpha")], vec![], Process::Sequential);
    let err = assert_err!(empty.kickoff(&llm).await);
    assert!(err.is_configuration());

    let stranger = Crew::new(
      vec![agent("Alpha")]
    , vec![Task::new("one", "x", agent("Gamma"))]
    , Process::Sequential
    );
    assert_err!(stranger.kickoff(&llm).await);
    assert!(recorder.requests().is_empty());
}

#[tokio::test]
async fn test_writing_crew_runs_research_write_edit()
{   let (llm, recorder) = fake_llm(vec![
      Ok(candidate("research report"))
    , Ok(candidate("first draft"))
    , Ok(json!({"text": "final article"}))
    ]);
    let writing = WritingAssistantCrew::with_language(Language::English);

    let article = assert_ok!(
      writing.create_article(&llm, "Rust", "systems programmers", 800).await
    );
    assert_eq!(article.raw, "final article");

    let requests = recorder.requests();
    assert_eq!(requests.len(), 3);
    let personas: Vec<&str> = requests.iter()
      .map(|r| r.system_instruction.as_ref().unwrap().parts[0].text.as_str())
      .collect();
    assert!(personas[0].starts_with("You are Senior Researcher."));
    assert!(personas[1].starts_with("You are Professional Writer."));
    assert!(personas[2].starts_with("You are Senior Editor."));

    let research = &requests[0].contents[0].parts[0].text;
    assert!(research.contains("\"Rust\""));
    assert!(research.contains("800-word"));
    assert!(research.contains("systems programmers"));
    let edit = &requests[2].contents[0].parts[0].text;
    assert!(edit.contains("research report"));
    assert!(edit.contains("first draft"));
}

#[tokio::test]
async fn test_writing_crew_defaults_to_traditional_chinese()
{   let (llm, recorder) = fake_llm(vec![]);
    let writing = WritingAssistantCrew::new();
    assert_eq!(writing.language, Language::TraditionalChinese);

    let topic = Language::TraditionalChinese.default_topic();
    let audience = Language::TraditionalChinese.default_audience();
    assert_ok!(writing.create_article(&llm, topic, audience, 1000).await);

    let requests = recorder.requests();
    assert_eq!(requests.len(), 3);
    assert!(requests[0].system_instruction.as_ref().unwrap().parts[0].text
      .starts_with("You are 資深研究員."));
    let research = &requests[0].contents[0].parts[0].text;
    assert!(research.contains("為主題\"人工智慧在現代醫療中的應用\"進行深入研究。"));
    assert!(research.contains("目標讀者：醫療專業人員和技術愛好者"));
    assert!(research.contains("1000字的文章"));
}

#[test]
fn test_language_parses_codes()
{   assert_eq!("zh-TW".parse::<Language>(), Ok(Language::TraditionalChinese));
    assert_eq!("EN".parse::<Language>(), Ok(Language::English));
    assert_err!("fr".parse::<Language>());
    assert_eq!(Language::English.to_string(), "en");
}

// ===== Article output =====

fn article(raw: &str) -> writing_crew::CrewOutput
{   writing_crew::CrewOutput
    {   raw: raw.to_string()
      , tasks_output: vec![]
    }
}

#[tokio::test]
async fn test_save_article_writes_utf8_and_previews()
{   let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("generated_article.md");
    let body = "# 標題\n\nshort article";

    let preview = assert_ok!(save_article(&article(body), &path).await);
    assert_eq!(std::fs::read_to_string(&path).unwrap(), body);
    assert_eq!(preview, format!("{}...", body));
}

#[tokio::test]
async fn test_save_article_preview_respects_char_boundaries()
{   let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("long.md");
    let body = "醫".repeat(PREVIEW_CHARS + 20);

    let preview = assert_ok!(save_article(&article(&body), &path).await);
    assert_eq!(std::fs::read(&path).unwrap(), body.as_bytes());
    assert_eq!(preview.chars().count(), PREVIEW_CHARS + 3);
    assert!(preview.ends_with("醫..."));
    assert_eq!(preview, format!("{}...", "醫".repeat(PREVIEW_CHARS)));
}

#[tokio::test]
async fn test_save_article_unwritable_path_is_output_error()
{   let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing").join("article.md");

    let err = assert_err!(save_article(&article("text"), &path).await);
    assert_eq!(err.kind(), ErrorKind::Output);
    match err
    {   Error::OutputError(msg) => assert!(msg.contains("article.md"))
      , other => panic!("expected OutputError, got {:?}", other)
    }
}

// ===== Gemini HTTP backend =====

mod http
{   use super::*;
    use writing_crew::providers::GeminiConnector;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ENDPOINT: &str = "/models/gemini-2.0-flash-lite:generateContent";

    fn llm_for(server: &MockServer) -> GeminiLlm
    {   GeminiLlm::new(
          GeminiConnector::new("test-key", server.uri())
        , "models/gemini-2.0-flash-lite"
        )
    }

    #[tokio::test]
    async fn test_gemini_generate_content_success()
    {   let server = MockServer::start().await;
        Mock::given(method("POST"))
          .and(path(ENDPOINT))
          .and(header("x-goog-api-key", "test-key"))
          .respond_with(ResponseTemplate::new(200).set_body_json(
            candidate("Hello from Gemini")
          ))
          .expect(1)
          .mount(&server)
          .await;

        let llm = llm_for(&server);
        let text = assert_ok!(
          llm.call(Prompt::from("Say hello"), None, &CallOptions::new()).await
        );
        assert_eq!(text, "Hello from Gemini");

        let received = server.received_requests().await.unwrap();
        let body: Value = serde_json::from_slice(&received[0].body).unwrap();
        assert_eq!(body["safetySettings"].as_array().unwrap().len(), 4);
        assert_eq!(body["generationConfig"]["topK"], 40);
    }

    #[tokio::test]
    async fn test_gemini_rate_limit_and_api_errors()
    {   let server = MockServer::start().await;
        Mock::given(method("POST"))
          .and(path(ENDPOINT))
          .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": {"code": 429, "message": "Quota exceeded", "status": "RESOURCE_EXHAUSTED"}
          })))
          .up_to_n_times(1)
          .mount(&server)
          .await;
        Mock::given(method("POST"))
          .and(path(ENDPOINT))
          .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {"code": 400, "message": "API key not valid"}
          })))
          .mount(&server)
          .await;

        let llm = llm_for(&server);
        let err = assert_err!(
          llm.call(Prompt::from("x"), None, &CallOptions::new()).await
        );
        assert_eq!(
          err
        , Error::RateLimitExceeded(
            "RESOURCE_EXHAUSTED: Quota exceeded".to_string()
          )
        );

        let err = assert_err!(
          llm.complete(&[Turn::user("x")], &CallOptions::new()).await
        );
        assert_eq!(err, Error::ApiError
        {   status: 400
          , message: "API key not valid".to_string()
        });
        assert!(err.is_generation());
    }

    #[tokio::test]
    #[ignore]
    async fn test_gemini_connection_failure_is_http_error()
    {   let llm = GeminiLlm::new(
          GeminiConnector::new("test-key", "http://127.0.0.1:1")
        , "gemini-2.0-flash-lite"
        );
        let err = assert_err!(
          llm.call(Prompt::from("x"), None, &CallOptions::new()).await
        );
        match err
        {   Error::HttpError(msg) => assert!(!msg.is_empty())
          , other => panic!("expected HttpError, got {:?}", other)
        }
    }
}
