//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};

use crate::domain::{Chapter, Course, Screen, Theme};
use crate::progress::ProgressSummary;
use crate::validation::RuleKind;

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    GetSession,
    Navigate {
        screen: Screen,
    },
    SelectCourse {
        #[serde(rename = "courseId")]
        course_id: String,
    },
    SelectChapter {
        #[serde(rename = "chapterId", default)]
        chapter_id: Option<String>,
    },
    AdvanceChapter,
    SubmitPractice {
        answer: String,
    },
    Explain {
        #[serde(rename = "outputLanguage", default)]
        output_language: Option<String>,
    },
    CheckCode {
        code: String,
        #[serde(rename = "outputLanguage", default)]
        output_language: Option<String>,
    },
    AnalyzeImage {
        #[serde(rename = "imageBase64")]
        image_base64: String,
        #[serde(default)]
        mime: Option<String>,
    },
    Speak {
        text: String,
    },
    Chat {
        text: String,
    },
    SetTheme {
        theme: Theme,
    },
    GetProgress,
}

impl ClientWsMessage {
    /// The `type` tag, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Ping => "ping",
            Self::GetSession => "get_session",
            Self::Navigate { .. } => "navigate",
            Self::SelectCourse { .. } => "select_course",
            Self::SelectChapter { .. } => "select_chapter",
            Self::AdvanceChapter => "advance_chapter",
            Self::SubmitPractice { .. } => "submit_practice",
            Self::Explain { .. } => "explain",
            Self::CheckCode { .. } => "check_code",
            Self::AnalyzeImage { .. } => "analyze_image",
            Self::Speak { .. } => "speak",
            Self::Chat { .. } => "chat",
            Self::SetTheme { .. } => "set_theme",
            Self::GetProgress => "get_progress",
        }
    }

    /// Size in bytes of the user-authored payload (answer, code, image, text), 0 if none.
    pub fn payload_len(&self) -> usize {
        match self {
            Self::SubmitPractice { answer } => answer.len(),
            Self::CheckCode { code, .. } => code.len(),
            Self::AnalyzeImage { image_base64, .. } => image_base64.len(),
            Self::Speak { text } | Self::Chat { text } => text.len(),
            _ => 0,
        }
    }
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    Session {
        session: SessionOut,
    },
    PracticeResult {
        result: PracticeResultOut,
    },
    Explanation {
        explanation: ExplanationOut,
    },
    CodeReview {
        feedback: String,
        #[serde(rename = "errorLine")]
        error_line: Option<u32>,
    },
    ImageAnalysis {
        text: String,
    },
    Speech {
        /// Base64 WAV, or null when no audio could be produced.
        #[serde(rename = "audioBase64")]
        audio_base64: Option<String>,
        mime: String,
    },
    ChatReply {
        message: ChatMessage,
    },
    Progress {
        summary: ProgressSummary,
    },
    Error {
        message: String,
    },
}

/// Snapshot of navigation state plus the profile scalars the UI renders with it.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionOut {
    pub current_screen: Screen,
    pub selected_course_id: Option<String>,
    pub selected_chapter_id: Option<String>,
    pub theme: Theme,
    pub playground_usage: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticeResultOut {
    pub course_id: String,
    pub chapter_id: String,
    pub passed: bool,
    pub message: String,
    pub hint: Option<String>,
    pub newly_completed: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplanationOut {
    pub course_id: String,
    pub chapter_id: String,
    pub text: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub role: String,
    pub text: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

//
// Catalog DTOs
//

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseSummaryOut {
    pub id: String,
    pub name: String,
    pub icon: String,
    pub description: String,
    pub chapter_count: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseOut {
    pub id: String,
    pub name: String,
    pub icon: String,
    pub description: String,
    pub chapters: Vec<ChapterOut>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterOut {
    pub id: String,
    pub title: String,
    pub definition: String,
    pub why_it_matters: String,
    pub key_points: Vec<String>,
    pub sample_code: String,
    pub common_mistakes: Vec<String>,
    pub practice: PracticeQuestionOut,
}

/// The rule itself stays server-side; only its kind is exposed.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticeQuestionOut {
    pub question: String,
    pub starter_code: String,
    pub hint: String,
    pub rule: RuleKind,
}

pub fn course_summary(c: &Course) -> CourseSummaryOut {
    CourseSummaryOut {
        id: c.id.clone(),
        name: c.name.clone(),
        icon: c.icon.clone(),
        description: c.description.clone(),
        chapter_count: c.chapters.len(),
    }
}

/// Convert a full `Course` (internal) to the public DTO.
pub fn to_out(c: &Course) -> CourseOut {
    CourseOut {
        id: c.id.clone(),
        name: c.name.clone(),
        icon: c.icon.clone(),
        description: c.description.clone(),
        chapters: c.chapters.iter().map(chapter_out).collect(),
    }
}

fn chapter_out(ch: &Chapter) -> ChapterOut {
    ChapterOut {
        id: ch.id.clone(),
        title: ch.title.clone(),
        definition: ch.definition.clone(),
        why_it_matters: ch.why_it_matters.clone(),
        key_points: ch.key_points.clone(),
        sample_code: ch.sample_code.clone(),
        common_mistakes: ch.common_mistakes.clone(),
        practice: PracticeQuestionOut {
            question: ch.practice.question.clone(),
            starter_code: ch.practice.starter_code.clone(),
            hint: ch.practice.hint.clone(),
            rule: ch.practice.rule.kind(),
        },
    }
}

//
// HTTP request/response DTOs
//

#[derive(Deserialize)]
pub struct NavigateIn {
    pub screen: Screen,
}

#[derive(Deserialize)]
pub struct SelectCourseIn {
    #[serde(rename = "courseId")]
    pub course_id: String,
}

#[derive(Deserialize)]
pub struct SelectChapterIn {
    #[serde(rename = "chapterId", default)]
    pub chapter_id: Option<String>,
}

#[derive(Deserialize)]
pub struct PracticeIn {
    pub answer: String,
}

#[derive(Deserialize)]
pub struct ExplainIn {
    #[serde(rename = "outputLanguage", default)]
    pub output_language: Option<String>,
}

#[derive(Deserialize)]
pub struct ThemeIn {
    pub theme: Theme,
}

#[derive(Deserialize)]
pub struct CheckCodeIn {
    pub code: String,
    #[serde(rename = "outputLanguage", default)]
    pub output_language: Option<String>,
}
#[derive(Serialize)]
pub struct CodeReviewOut {
    pub feedback: String,
    #[serde(rename = "errorLine")]
    pub error_line: Option<u32>,
}

#[derive(Deserialize)]
pub struct ImageIn {
    #[serde(rename = "imageBase64")]
    pub image_base64: String,
    #[serde(default)]
    pub mime: Option<String>,
}
#[derive(Serialize)]
pub struct ImageAnalysisOut {
    pub text: String,
}

#[derive(Deserialize)]
pub struct SpeechIn {
    pub text: String,
}

#[derive(Deserialize)]
pub struct ChatIn {
    pub message: String,
}

#[derive(Serialize)]
pub struct TipOut {
    pub tip: String,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
    #[serde(rename = "aiEnabled")]
    pub ai_enabled: bool,
}

#[derive(Serialize)]
pub struct ErrorOut {
    pub error: String,
}
