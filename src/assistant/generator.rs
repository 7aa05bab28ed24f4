//! Card generation job: drives one external assistant run from upload to
//! parsed cards.
//!
//! The job is a linear state machine (upload file, configure assistant, open
//! thread, enqueue instruction, start run, poll, extract, cleanup) executed
//! synchronously inside the request handler. Any step failure aborts the
//! whole job; there are no retries. The polling phase is bounded by a caller
//! cancellation token and a configured deadline, so a disconnected client or
//! a stuck run cannot pin a task forever.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::client::{AssistantApi, MessageList, RunStatus};
use super::AssistantError;

/// Requesting this count for a card type means "any number".
pub const ANY_COUNT: i32 = -1;

const POLL_INTERVAL: Duration = Duration::from_secs(1);
const UPLOAD_FILENAME: &str = "document.pdf";
const ASSISTANT_NAME: &str = "Flash Card Generator";
const ASSISTANT_INSTRUCTIONS: &str = "You are given a file. You need to perform the action \
    specified in the next instruction using the information from the file. It will be given \
    as a PDF file. Your response should be in JSON format in the manner specified. The output \
    should be directly parseable by a JSON decoder. Do not include any additional text in \
    your response.";

const JSON_FENCE: &str = "```json";
const FENCE: &str = "```";

/// Per-request generation parameters, decoded from the `metadata` form field.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerationOptions {
    #[serde(rename = "tfCount")]
    pub tf_count: i32,
    #[serde(rename = "mcCount")]
    pub mc_count: i32,
    #[serde(rename = "normalCount")]
    pub normal_count: i32,
    #[serde(default)]
    pub suggestions: String,
}

/// One generated question/answer pair.
#[derive(Debug, Clone, Deserialize)]
pub struct GeneratedCard {
    pub question: Question,
    pub answer: String,
}

/// A question is either plain text or a typed value such as
/// `{"type": "true_false", "content": "..."}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Question {
    Plain(String),
    Structured {
        #[serde(rename = "type")]
        kind: String,
        content: String,
    },
}

impl Question {
    /// Render the question for the card front. Structured questions are kept
    /// lossless by storing their JSON form.
    pub fn into_front(self) -> String {
        match self {
            Question::Plain(text) => text,
            structured @ Question::Structured { .. } => {
                serde_json::to_string(&structured).unwrap_or_default()
            }
        }
    }
}

/// Drives the external generation job.
pub struct CardGenerator {
    api: Arc<dyn AssistantApi>,
    poll_interval: Duration,
    poll_deadline: Duration,
}

impl CardGenerator {
    pub fn new(api: Arc<dyn AssistantApi>, poll_deadline: Duration) -> Self {
        Self::with_poll_interval(api, POLL_INTERVAL, poll_deadline)
    }

    pub fn with_poll_interval(
        api: Arc<dyn AssistantApi>,
        poll_interval: Duration,
        poll_deadline: Duration,
    ) -> Self {
        Self {
            api,
            poll_interval,
            poll_deadline,
        }
    }

    /// Run the full job and return the parsed cards.
    ///
    /// The uploaded artifact is deleted once the job finishes, whether or not
    /// it succeeded; a failed delete is logged and otherwise ignored.
    pub async fn generate(
        &self,
        file_bytes: Vec<u8>,
        options: &GenerationOptions,
        cancel: CancellationToken,
    ) -> Result<Vec<GeneratedCard>, AssistantError> {
        let file = self.api.upload_file(UPLOAD_FILENAME, file_bytes).await?;
        tracing::info!(file_id = %file.id, "uploaded generation input");

        let outcome = self.run_job(&file.id, options, cancel).await;

        if let Err(err) = self.api.delete_file(&file.id).await {
            tracing::warn!(file_id = %file.id, "failed to delete uploaded file: {}", err);
        }

        let raw = outcome?;
        let payload = strip_code_fences(&raw);
        serde_json::from_str(&payload)
            .map_err(|e| AssistantError::MalformedResponse(e.to_string()))
    }

    async fn run_job(
        &self,
        file_id: &str,
        options: &GenerationOptions,
        cancel: CancellationToken,
    ) -> Result<String, AssistantError> {
        let assistant = self
            .api
            .create_assistant(ASSISTANT_NAME, ASSISTANT_INSTRUCTIONS, file_id)
            .await?;
        let thread = self.api.create_thread().await?;

        self.api
            .create_message(&thread.id, &build_prompt(options))
            .await?;

        let mut run = self.api.create_run(&thread.id, &assistant.id).await?;
        let started = tokio::time::Instant::now();

        // The run is pull-based: re-fetch status until it reports completed.
        // Terminal failure states are not special-cased here; they fall out
        // through the deadline. A fetch failure aborts the job immediately.
        while run.status != RunStatus::Completed {
            if started.elapsed() >= self.poll_deadline {
                return Err(AssistantError::Timeout);
            }

            tokio::select! {
                _ = cancel.cancelled() => return Err(AssistantError::Cancelled),
                _ = tokio::time::sleep(self.poll_interval) => {}
            }

            run = self.api.retrieve_run(&thread.id, &run.id).await?;
            tracing::debug!(run_id = %run.id, status = ?run.status, "run status");
        }

        let messages = self.api.list_messages(&thread.id, &run.id).await?;
        extract_text(&messages)
    }
}

/// Take the first message's first content block as the response text.
fn extract_text(messages: &MessageList) -> Result<String, AssistantError> {
    messages
        .data
        .first()
        .and_then(|message| message.content.first())
        .and_then(|content| content.text.as_ref())
        .map(|text| text.value.clone())
        .ok_or_else(|| {
            AssistantError::MalformedResponse("run produced no text content".to_string())
        })
}

/// Strip markdown code-fence markers from the assistant's reply, yielding a
/// best-effort JSON payload. Every occurrence of the "```json" marker is
/// removed, plus one trailing bare fence.
pub fn strip_code_fences(raw: &str) -> String {
    let without_open = raw.replace(JSON_FENCE, "");
    let trimmed = without_open.trim_end();
    let without_close = trimmed.strip_suffix(FENCE).unwrap_or(trimmed);
    without_close.trim().to_string()
}

fn count_phrase(count: i32, kind: &str) -> String {
    if count == ANY_COUNT {
        format!("any number of {} cards", kind)
    } else {
        format!("exactly {} {} cards", count, kind)
    }
}

/// Build the single instruction message for the run.
pub fn build_prompt(options: &GenerationOptions) -> String {
    let mut prompt = format!(
        "Please generate {}, {}, and {} from the file given. \
         Structure the response in JSON format as an array with one object per flash card, \
         each having a question key and an answer key. \
         For true/false and multiple choice cards the question must be an object with a type \
         key and a content key; for regular cards the question is a plain string. \
         Return only the JSON array, without any additional text.",
        count_phrase(options.tf_count, "true/false"),
        count_phrase(options.mc_count, "multiple choice"),
        count_phrase(options.normal_count, "question and answer"),
    );

    if !options.suggestions.is_empty() {
        prompt.push_str(&format!(
            " As a suggestion, focus on the following topic: {}",
            options.suggestions
        ));
    }

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assistant::client::{
        AssistantHandle, FileHandle, Message, MessageContent, MessageText, Run, ThreadHandle,
    };
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    const CARDS_JSON: &str = r#"[{"question":"Q","answer":"A"}]"#;

    /// Scripted fake: completes the run after a fixed number of status
    /// fetches, then serves a canned response.
    struct ScriptedAssistant {
        completes_after: usize,
        response: String,
        fail_retrieve: bool,
        fail_delete: bool,
        retrieve_calls: AtomicUsize,
        deleted: AtomicBool,
    }

    impl ScriptedAssistant {
        fn new(completes_after: usize, response: &str) -> Self {
            Self {
                completes_after,
                response: response.to_string(),
                fail_retrieve: false,
                fail_delete: false,
                retrieve_calls: AtomicUsize::new(0),
                deleted: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl AssistantApi for ScriptedAssistant {
        async fn upload_file(
            &self,
            _filename: &str,
            _bytes: Vec<u8>,
        ) -> Result<FileHandle, AssistantError> {
            Ok(FileHandle { id: "file_1".into() })
        }

        async fn create_assistant(
            &self,
            _name: &str,
            _instructions: &str,
            _file_id: &str,
        ) -> Result<AssistantHandle, AssistantError> {
            Ok(AssistantHandle { id: "asst_1".into() })
        }

        async fn create_thread(&self) -> Result<ThreadHandle, AssistantError> {
            Ok(ThreadHandle { id: "thread_1".into() })
        }

        async fn create_message(
            &self,
            _thread_id: &str,
            _content: &str,
        ) -> Result<(), AssistantError> {
            Ok(())
        }

        async fn create_run(
            &self,
            _thread_id: &str,
            _assistant_id: &str,
        ) -> Result<Run, AssistantError> {
            Ok(Run {
                id: "run_1".into(),
                status: RunStatus::Queued,
            })
        }

        async fn retrieve_run(
            &self,
            _thread_id: &str,
            _run_id: &str,
        ) -> Result<Run, AssistantError> {
            if self.fail_retrieve {
                return Err(AssistantError::Api {
                    status: 500,
                    message: "boom".into(),
                });
            }
            let calls = self.retrieve_calls.fetch_add(1, Ordering::SeqCst) + 1;
            let status = if calls >= self.completes_after {
                RunStatus::Completed
            } else {
                RunStatus::InProgress
            };
            Ok(Run {
                id: "run_1".into(),
                status,
            })
        }

        async fn list_messages(
            &self,
            _thread_id: &str,
            _run_id: &str,
        ) -> Result<MessageList, AssistantError> {
            Ok(MessageList {
                data: vec![Message {
                    id: "msg_1".into(),
                    role: "assistant".into(),
                    content: vec![MessageContent {
                        kind: "text".into(),
                        text: Some(MessageText {
                            value: self.response.clone(),
                        }),
                    }],
                }],
            })
        }

        async fn delete_file(&self, _file_id: &str) -> Result<(), AssistantError> {
            self.deleted.store(true, Ordering::SeqCst);
            if self.fail_delete {
                return Err(AssistantError::Api {
                    status: 500,
                    message: "delete failed".into(),
                });
            }
            Ok(())
        }
    }

    fn options() -> GenerationOptions {
        GenerationOptions {
            tf_count: 2,
            mc_count: 3,
            normal_count: 5,
            suggestions: "photosynthesis".into(),
        }
    }

    fn generator(api: Arc<ScriptedAssistant>) -> CardGenerator {
        CardGenerator::with_poll_interval(
            api,
            Duration::from_millis(1),
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn polls_until_completed_then_extracts() {
        let api = Arc::new(ScriptedAssistant::new(3, CARDS_JSON));
        let cards = generator(api.clone())
            .generate(vec![1, 2, 3], &options(), CancellationToken::new())
            .await
            .unwrap();

        // One status observation per poll iteration, plus the initial status
        // returned by run creation.
        assert_eq!(api.retrieve_calls.load(Ordering::SeqCst), 3);
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].answer, "A");
        assert!(api.deleted.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn fenced_response_parses() {
        let fenced = format!("```json\n{}\n```", CARDS_JSON);
        let api = Arc::new(ScriptedAssistant::new(1, &fenced));
        let cards = generator(api)
            .generate(vec![], &options(), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(cards.len(), 1);
    }

    #[tokio::test]
    async fn status_fetch_failure_aborts_but_still_cleans_up() {
        let mut scripted = ScriptedAssistant::new(3, CARDS_JSON);
        scripted.fail_retrieve = true;
        let api = Arc::new(scripted);

        let err = generator(api.clone())
            .generate(vec![], &options(), CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, AssistantError::Api { .. }));
        assert!(api.deleted.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn cleanup_failure_is_not_fatal() {
        let mut scripted = ScriptedAssistant::new(1, CARDS_JSON);
        scripted.fail_delete = true;
        let api = Arc::new(scripted);

        let cards = generator(api)
            .generate(vec![], &options(), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(cards.len(), 1);
    }

    #[tokio::test]
    async fn cancelled_token_aborts_polling() {
        let api = Arc::new(ScriptedAssistant::new(usize::MAX, CARDS_JSON));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = generator(api.clone())
            .generate(vec![], &options(), cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, AssistantError::Cancelled));
        assert_eq!(api.retrieve_calls.load(Ordering::SeqCst), 0);
        assert!(api.deleted.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn deadline_bounds_the_poll_loop() {
        let api = Arc::new(ScriptedAssistant::new(usize::MAX, CARDS_JSON));
        let generator = CardGenerator::with_poll_interval(
            api,
            Duration::from_millis(1),
            Duration::ZERO,
        );

        let err = generator
            .generate(vec![], &options(), CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, AssistantError::Timeout));
    }

    #[tokio::test]
    async fn garbage_response_is_malformed() {
        let api = Arc::new(ScriptedAssistant::new(1, "the file discusses plants"));
        let err = generator(api)
            .generate(vec![], &options(), CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, AssistantError::MalformedResponse(_)));
    }

    #[test]
    fn strips_json_code_fences() {
        assert_eq!(
            strip_code_fences("```json\n[{\"question\":\"Q\",\"answer\":\"A\"}]\n```"),
            r#"[{"question":"Q","answer":"A"}]"#
        );
        assert_eq!(strip_code_fences("[1, 2]"), "[1, 2]");
        assert_eq!(strip_code_fences("```json[1]```"), "[1]");
    }

    #[test]
    fn prompt_includes_counts_and_topic() {
        let prompt = build_prompt(&options());
        assert!(prompt.contains("exactly 2 true/false cards"));
        assert!(prompt.contains("exactly 3 multiple choice cards"));
        assert!(prompt.contains("exactly 5 question and answer cards"));
        assert!(prompt.contains("focus on the following topic: photosynthesis"));
    }

    #[test]
    fn prompt_uses_any_number_for_sentinel() {
        let prompt = build_prompt(&GenerationOptions {
            tf_count: ANY_COUNT,
            mc_count: 0,
            normal_count: ANY_COUNT,
            suggestions: String::new(),
        });
        assert!(prompt.contains("any number of true/false cards"));
        assert!(prompt.contains("any number of question and answer cards"));
        assert!(!prompt.contains("As a suggestion"));
    }

    #[test]
    fn question_parses_plain_and_structured() {
        let cards: Vec<GeneratedCard> = serde_json::from_str(
            r#"[
                {"question": "What is ATP?", "answer": "Energy currency"},
                {"question": {"type": "true_false", "content": "The sky is green"}, "answer": "false"}
            ]"#,
        )
        .unwrap();

        assert!(matches!(cards[0].question, Question::Plain(_)));
        assert_eq!(cards[0].question.clone().into_front(), "What is ATP?");

        match &cards[1].question {
            Question::Structured { kind, content } => {
                assert_eq!(kind, "true_false");
                assert_eq!(content, "The sky is green");
            }
            other => panic!("expected structured question, got {:?}", other),
        }
        let front = cards[1].question.clone().into_front();
        assert!(front.contains("true_false"));
        assert!(serde_json::from_str::<Question>(&front).is_ok());
    }
}
