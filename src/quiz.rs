use clap::ValueEnum;
use log::{info, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{Error, Result};
use crate::generator::ContentGenerator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum Skill {
    Reading,
    Listening,
    Writing,
    Speaking,
}

/// CEFR band the generated material is pitched at
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum, strum_macros::Display,
)]
pub enum Level {
    A2,
    B1,
    B2,
    C1,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub prompt: String,
    pub options: Vec<String>,
    pub answer: usize,
    #[serde(default)]
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingQuiz {
    pub title: String,
    pub passage: String,
    pub questions: Vec<Question>,
}

/// A story that is read aloud; the learner answers without seeing the text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListeningQuiz {
    pub title: String,
    pub story: String,
    pub questions: Vec<Question>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WritingTask {
    pub topic: String,
    pub instructions: String,
    pub min_words: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrammarIssue {
    pub original: String,
    pub suggestion: String,
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrammarReport {
    pub score: u8,
    pub corrected_text: String,
    #[serde(default)]
    pub issues: Vec<GrammarIssue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeakingPassage {
    pub title: String,
    pub text: String,
}

/// Anything the learner answers multiple-choice questions about
pub trait QuestionSet {
    fn title(&self) -> &str;
    fn questions(&self) -> &[Question];
}

impl QuestionSet for ReadingQuiz {
    fn title(&self) -> &str {
        &self.title
    }

    fn questions(&self) -> &[Question] {
        &self.questions
    }
}

impl QuestionSet for ListeningQuiz {
    fn title(&self) -> &str {
        &self.title
    }

    fn questions(&self) -> &[Question] {
        &self.questions
    }
}

/// Structural checks on generated content before it reaches the screen
pub trait Validate {
    fn validate(&self) -> Result<()>;
}

fn require(ok: bool, what: &str) -> Result<()> {
    if ok {
        Ok(())
    } else {
        Err(Error::MalformedResponse(what.to_string()))
    }
}

fn validate_questions(questions: &[Question]) -> Result<()> {
    require(!questions.is_empty(), "quiz has no questions")?;
    for (i, q) in questions.iter().enumerate() {
        require(!q.prompt.trim().is_empty(), &format!("question {i} is blank"))?;
        require(
            q.options.len() >= 2,
            &format!("question {i} has fewer than two options"),
        )?;
        require(
            q.answer < q.options.len(),
            &format!("question {i} answer is out of range"),
        )?;
    }
    Ok(())
}

impl Validate for ReadingQuiz {
    fn validate(&self) -> Result<()> {
        require(!self.passage.trim().is_empty(), "reading passage is empty")?;
        validate_questions(&self.questions)
    }
}

impl Validate for ListeningQuiz {
    fn validate(&self) -> Result<()> {
        require(!self.story.trim().is_empty(), "listening story is empty")?;
        validate_questions(&self.questions)
    }
}

impl Validate for WritingTask {
    fn validate(&self) -> Result<()> {
        require(!self.topic.trim().is_empty(), "writing topic is empty")
    }
}

impl Validate for GrammarReport {
    fn validate(&self) -> Result<()> {
        require(self.score <= 100, "grammar score above 100")
    }
}

impl Validate for SpeakingPassage {
    fn validate(&self) -> Result<()> {
        require(!self.text.trim().is_empty(), "speaking passage is empty")
    }
}

fn question_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "prompt": {"type": "STRING"},
            "options": {"type": "ARRAY", "items": {"type": "STRING"}},
            "answer": {"type": "INTEGER", "description": "zero-based index of the correct option"},
            "explanation": {"type": "STRING"}
        },
        "required": ["prompt", "options", "answer", "explanation"]
    })
}

fn reading_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "title": {"type": "STRING"},
            "passage": {"type": "STRING"},
            "questions": {"type": "ARRAY", "items": question_schema()}
        },
        "required": ["title", "passage", "questions"]
    })
}

fn listening_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "title": {"type": "STRING"},
            "story": {"type": "STRING"},
            "questions": {"type": "ARRAY", "items": question_schema()}
        },
        "required": ["title", "story", "questions"]
    })
}

fn writing_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "topic": {"type": "STRING"},
            "instructions": {"type": "STRING"},
            "min_words": {"type": "INTEGER"}
        },
        "required": ["topic", "instructions", "min_words"]
    })
}

fn grammar_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "score": {"type": "INTEGER", "description": "0 to 100"},
            "corrected_text": {"type": "STRING"},
            "issues": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "original": {"type": "STRING"},
                        "suggestion": {"type": "STRING"},
                        "explanation": {"type": "STRING"}
                    },
                    "required": ["original", "suggestion", "explanation"]
                }
            }
        },
        "required": ["score", "corrected_text", "issues"]
    })
}

fn speaking_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "title": {"type": "STRING"},
            "text": {"type": "STRING"}
        },
        "required": ["title", "text"]
    })
}

async fn request<G, T>(generator: &G, skill: Skill, prompt: &str, schema: &Value) -> Result<T>
where
    G: ContentGenerator,
    T: DeserializeOwned + Validate,
{
    let value = generator.generate_json(prompt, schema).await?;
    let parsed: T = serde_json::from_value(value)?;
    if let Err(e) = parsed.validate() {
        warn!("rejected {skill} content: {e}");
        return Err(e);
    }
    Ok(parsed)
}

pub async fn generate_reading<G: ContentGenerator>(
    generator: &G,
    level: Level,
    questions: usize,
) -> Result<ReadingQuiz> {
    info!("generating reading quiz at {level}");
    let prompt = format!(
        "Write an original reading passage of 180-250 words for an English learner at CEFR \
         level {level}, with a short title. Then write {questions} multiple-choice \
         comprehension questions with four options each, the zero-based index of the correct \
         option, and a one-sentence explanation."
    );
    request(generator, Skill::Reading, &prompt, &reading_schema()).await
}

pub async fn generate_listening<G: ContentGenerator>(
    generator: &G,
    level: Level,
    questions: usize,
) -> Result<ListeningQuiz> {
    info!("generating listening quiz at {level}");
    let prompt = format!(
        "Write a short story of 120-180 words that will be read aloud to an English learner at \
         CEFR level {level}, with a short title. Use natural spoken English. Then write \
         {questions} multiple-choice listening questions with four options each, the zero-based \
         index of the correct option, and a one-sentence explanation."
    );
    request(generator, Skill::Listening, &prompt, &listening_schema()).await
}

pub async fn generate_writing_task<G: ContentGenerator>(
    generator: &G,
    level: Level,
) -> Result<WritingTask> {
    info!("generating writing task at {level}");
    let prompt = format!(
        "Suggest one everyday writing topic for an English learner at CEFR level {level}. Give \
         the topic, two sentences of instructions, and a sensible minimum word count between \
         40 and 150."
    );
    request(generator, Skill::Writing, &prompt, &writing_schema()).await
}

pub async fn generate_speaking_passage<G: ContentGenerator>(
    generator: &G,
    level: Level,
) -> Result<SpeakingPassage> {
    info!("generating speaking passage at {level}");
    let prompt = format!(
        "Write a passage of 50-80 words for an English learner at CEFR level {level} to read \
         aloud for pronunciation practice, with a short title. Avoid numerals and unusual names."
    );
    request(generator, Skill::Speaking, &prompt, &speaking_schema()).await
}

/// Ask the generator to grade a submission. Blank text is rejected locally.
pub async fn grade_writing<G: ContentGenerator>(
    generator: &G,
    task: &WritingTask,
    text: &str,
) -> Result<GrammarReport> {
    if text.trim().is_empty() {
        return Err(Error::InvalidInput("nothing was written".into()));
    }

    let prompt = format!(
        "You are an English teacher. The student was asked to write about \"{topic}\" \
         ({instructions}). Grade the grammar, spelling and word choice of the text below from \
         0 to 100, give a corrected version, and list each mistake with the original fragment, \
         a suggestion and a short explanation.\n\nStudent text:\n{text}",
        topic = task.topic,
        instructions = task.instructions,
    );
    request(generator, Skill::Writing, &prompt, &grammar_schema()).await
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizResult {
    pub correct: usize,
    pub total: usize,
    pub score: u8,
}

/// The learner's answers to a multiple-choice quiz
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizAttempt {
    answers: Vec<Option<usize>>,
}

impl QuizAttempt {
    pub fn new(questions: &[Question]) -> Self {
        Self {
            answers: vec![None; questions.len()],
        }
    }

    /// Returns false when the question or option does not exist.
    pub fn select(&mut self, questions: &[Question], question: usize, option: usize) -> bool {
        match (questions.get(question), self.answers.get_mut(question)) {
            (Some(q), Some(slot)) if option < q.options.len() => {
                *slot = Some(option);
                true
            }
            _ => false,
        }
    }

    pub fn answer(&self, question: usize) -> Option<usize> {
        self.answers.get(question).copied().flatten()
    }

    pub fn is_complete(&self) -> bool {
        self.answers.iter().all(Option::is_some)
    }

    pub fn grade(&self, questions: &[Question]) -> QuizResult {
        let correct = questions
            .iter()
            .zip(&self.answers)
            .filter(|(q, a)| **a == Some(q.answer))
            .count();
        let total = questions.len();
        let score = if total == 0 {
            0
        } else {
            ((correct as f64 / total as f64) * 100.0).round() as u8
        };

        QuizResult {
            correct,
            total,
            score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::fake::FakeGenerator;
    use assert_matches::assert_matches;

    fn question(answer: usize) -> Question {
        Question {
            prompt: "Where did Tom go?".into(),
            options: vec!["Home".into(), "School".into(), "Park".into()],
            answer,
            explanation: String::new(),
        }
    }

    fn reading_reply() -> Value {
        json!({
            "title": "A Rainy Day",
            "passage": "It rained all day, so Tom stayed home and read.",
            "questions": [{
                "prompt": "Why did Tom stay home?",
                "options": ["It rained", "He was sick"],
                "answer": 0,
                "explanation": "The passage says it rained."
            }]
        })
    }

    #[tokio::test]
    async fn test_generate_reading_parses_reply() {
        let generator = FakeGenerator::replying(vec![reading_reply()]);
        let quiz = generate_reading(&generator, Level::B2, 1).await.unwrap();
        assert_eq!(quiz.title, "A Rainy Day");
        assert_eq!(quiz.questions.len(), 1);
        let prompt = generator.last_prompt().unwrap();
        assert!(prompt.contains("B2"));
    }

    #[tokio::test]
    async fn test_out_of_range_answer_is_malformed() {
        let mut reply = reading_reply();
        reply["questions"][0]["answer"] = json!(5);
        let generator = FakeGenerator::replying(vec![reply]);
        assert_matches!(
            generate_reading(&generator, Level::B1, 1).await,
            Err(Error::MalformedResponse(_))
        );
    }

    #[tokio::test]
    async fn test_missing_field_is_json_error() {
        let generator = FakeGenerator::replying(vec![json!({"title": "x"})]);
        assert_matches!(
            generate_listening(&generator, Level::B1, 2).await,
            Err(Error::Json(_))
        );
    }

    #[tokio::test]
    async fn test_service_failure_propagates() {
        let generator = FakeGenerator::default();
        assert_matches!(
            generate_speaking_passage(&generator, Level::A2).await,
            Err(Error::Service { .. })
        );
    }

    #[tokio::test]
    async fn test_grade_writing_rejects_blank_text_without_request() {
        let generator = FakeGenerator::default();
        let task = WritingTask {
            topic: "Your weekend".into(),
            instructions: "Describe it.".into(),
            min_words: 40,
        };
        assert_matches!(
            grade_writing(&generator, &task, "   ").await,
            Err(Error::InvalidInput(_))
        );
        assert!(generator.last_prompt().is_none());
    }

    #[tokio::test]
    async fn test_grade_writing_returns_report() {
        let generator = FakeGenerator::replying(vec![json!({
            "score": 80,
            "corrected_text": "I went to the park.",
            "issues": [{"original": "I goed", "suggestion": "I went", "explanation": "Irregular past."}]
        })]);
        let task = WritingTask {
            topic: "Your weekend".into(),
            instructions: "Describe it.".into(),
            min_words: 40,
        };
        let report = grade_writing(&generator, &task, "I goed to the park.")
            .await
            .unwrap();
        assert_eq!(report.score, 80);
        assert_eq!(report.issues.len(), 1);
        assert!(generator.last_prompt().unwrap().contains("I goed to the park."));
    }

    #[tokio::test]
    async fn test_grammar_score_above_hundred_is_malformed() {
        let generator = FakeGenerator::replying(vec![json!({
            "score": 140,
            "corrected_text": "",
            "issues": []
        })]);
        let task = WritingTask {
            topic: "t".into(),
            instructions: "i".into(),
            min_words: 10,
        };
        assert_matches!(
            grade_writing(&generator, &task, "text").await,
            Err(Error::MalformedResponse(_))
        );
    }

    #[test]
    fn test_validate_rejects_single_option() {
        let mut q = question(0);
        q.options.truncate(1);
        assert!(validate_questions(&[q]).is_err());
        assert!(validate_questions(&[]).is_err());
        assert!(validate_questions(&[question(2)]).is_ok());
    }

    #[test]
    fn test_attempt_grading() {
        let questions = vec![question(0), question(1), question(2)];
        let mut attempt = QuizAttempt::new(&questions);
        assert!(!attempt.is_complete());

        assert!(attempt.select(&questions, 0, 0));
        assert!(attempt.select(&questions, 1, 2));
        assert!(!attempt.select(&questions, 2, 7));
        assert!(!attempt.select(&questions, 9, 0));

        let result = attempt.grade(&questions);
        assert_eq!(result.correct, 1);
        assert_eq!(result.total, 3);
        assert_eq!(result.score, 33);
        assert_eq!(attempt.answer(1), Some(2));
        assert_eq!(attempt.answer(2), None);
    }

    #[test]
    fn test_attempt_changing_answer() {
        let questions = vec![question(1)];
        let mut attempt = QuizAttempt::new(&questions);
        attempt.select(&questions, 0, 0);
        attempt.select(&questions, 0, 1);
        assert!(attempt.is_complete());
        assert_eq!(attempt.grade(&questions).score, 100);
    }

    #[test]
    fn test_level_display() {
        assert_eq!(Level::B1.to_string(), "B1");
        assert_eq!(Skill::Listening.to_string(), "Listening");
    }
}
