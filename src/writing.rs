//! The research -> write -> edit article pipeline

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use log::{debug, error, info};

use crate::crew::{Agent, Crew, CrewOutput, Process, Task};
use crate::error::Error;
use crate::LanguageModel;

pub const DEFAULT_WORD_COUNT: usize = 1000;
pub const PREVIEW_CHARS: usize = 500;

/// Language of the agent instructions, and so of the article
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language
{   #[default]
    TraditionalChinese
  , English
}

impl Language
{   pub fn code(&self) -> &'static str
    {   match self
        {   Language::TraditionalChinese => "zh-TW"
          , Language::English => "en"
        }
    }

    pub fn default_topic(&self) -> &'static str
    {   match self
        {   Language::TraditionalChinese => "人工智慧在現代醫療中的應用"
          , Language::English =>
              "Applications of artificial intelligence in modern healthcare"
        }
    }

    pub fn default_audience(&self) -> &'static str
    {   match self
        {   Language::TraditionalChinese => "醫療專業人員和技術愛好者"
          , Language::English =>
              "Healthcare professionals and technology enthusiasts"
        }
    }
}

impl fmt::Display for Language
{   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {   f.write_str(self.code())
    }
}

impl FromStr for Language
{   type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {   match s.trim().to_ascii_lowercase().as_str()
        {   "zh-tw" | "zh" | "zh-hant" => Ok(Language::TraditionalChinese)
          , "en" | "english" => Ok(Language::English)
          , other => Err(format!(
              "unsupported language '{}' (expected zh-TW or en)", other
            ))
        }
    }
}

/// Three agents that research, draft and edit an article
#[derive(Debug, Clone)]
pub struct WritingAssistantCrew
{   pub language: Language
  , pub researcher: Agent
  , pub writer: Agent
  , pub editor: Agent
}

impl WritingAssistantCrew
{   /// Crew with the Traditional Chinese instructions
    pub fn new() -> Self
    {   WritingAssistantCrew::with_language(Language::default())
    }

    pub fn with_language(language: Language) -> Self
    {   let (researcher, writer, editor) = match language
        {   Language::TraditionalChinese => (
              Agent::new(
                "資深研究員"
              , "進行主題研究並收集相關資訊"
              , "你是一位經驗豐富的研究員，擅長收集、分析並整理資訊。\n\
                 你擅長使用各種來源來獲取準確且相關的資訊。"
              )
            , Agent::new(
                "專業作家"
              , "撰寫高質量、引人入勝的內容"
              , "你是一位才華洋溢的作家，擅長將複雜的資訊轉化為\n\
                 易於理解且引人入勝的內容。你特別擅長根據研究資料創作文章。"
              )
            , Agent::new(
                "資深編輯"
              , "確保內容準確、連貫且符合風格指南"
              , "你是一位嚴謹的編輯，對細節有敏銳的觀察力。\n\
                 你擅長改進寫作風格、糾正錯誤並確保內容流暢。"
              )
            )
          , Language::English => (
              Agent::new(
                "Senior Researcher"
              , "Research the topic and gather relevant information"
              , "You are an experienced researcher, skilled at collecting, \
                 analysing and organising information. You are good at using \
                 a wide range of sources to obtain accurate and relevant facts."
              )
            , Agent::new(
                "Professional Writer"
              , "Write high-quality, engaging content"
              , "You are a talented writer who turns complex information into \
                 content that is easy to understand and engaging. You are \
                 especially good at writing articles from research material."
              )
            , Agent::new(
                "Senior Editor"
              , "Make sure the content is accurate, coherent and follows the \
                 style guide"
              , "You are a meticulous editor with a sharp eye for detail. You \
                 are good at improving writing style, correcting mistakes and \
                 making sure the content flows."
              )
            )
        };

        WritingAssistantCrew
        {   language
          , researcher: researcher.verbose(true)
          , writer: writer.verbose(true)
          , editor: editor.verbose(true)
        }
    }

    /// The three tasks, in execution order
    pub fn tasks(
      &self
    , topic: &str
    , target_audience: &str
    , word_count: usize
    ) -> Vec<Task>
    {   let [research, write, edit] = match self.language
        {   Language::TraditionalChinese => chinese_tasks(
              topic, target_audience, word_count
            )
          , Language::English => english_tasks(
              topic, target_audience, word_count
            )
        };

        vec![
          Task::new(research.0, research.1, self.researcher.clone())
        , Task::new(write.0, write.1, self.writer.clone())
        , Task::new(edit.0, edit.1, self.editor.clone())
        ]
    }

    /// Wire the agents and tasks into a sequential crew
    pub fn crew(
      &self
    , topic: &str
    , target_audience: &str
    , word_count: usize
    ) -> Crew
    {   Crew::new(
          vec![
            self.researcher.clone()
          , self.writer.clone()
          , self.editor.clone()
          ]
        , self.tasks(topic, target_audience, word_count)
        , Process::Sequential
        )
    }

    /// Research, write and edit an article
    pub async fn create_article<L>(
      &self
    , llm: &L
    , topic: &str
    , target_audience: &str
    , word_count: usize
    ) -> Result<CrewOutput, Error>
    where
      L: LanguageModel + ?Sized
    {   info!(
          "Creating {}-word {} article on '{}' for {}",
          word_count, self.language, topic, target_audience
        );
        self.crew(topic, target_audience, word_count)
          .kickoff(llm)
          .await
    }
}

impl Default for WritingAssistantCrew
{   fn default() -> Self
    {   WritingAssistantCrew::new()
    }
}

/// (description, expected output) for research, write and edit
type TaskText = [(String, String); 3];

fn chinese_tasks(
  topic: &str
, target_audience: &str
, word_count: usize
) -> TaskText
{   [
      ( format!(
          "為主題\"{topic}\"進行深入研究。\n\
           目標讀者：{target_audience}\n\
           收集足夠的資訊來撰寫一篇{word_count}字的文章。\n\
           確保資訊準確、相關且最新。"
        )
      , format!(
          "關於{topic}的詳細研究報告，包含：\n\
           - 主要概念和定義\n\
           - 關鍵事實和數據\n\
           - 相關例子和案例研究\n\
           - 當前趨勢和發展"
        )
      )
    , ( format!(
          "根據研究結果，撰寫一篇關於\"{topic}\"的{word_count}字文章。\n\
           目標讀者：{target_audience}\n\
           確保內容：\n\
           - 結構清晰\n\
           - 資訊準確\n\
           - 引人入勝\n\
           - 符合目標讀者的需求"
        )
      , format!(
          "一篇結構完整、內容豐富的{word_count}字文章，\n\
           涵蓋{topic}的所有重要面向，並針對{target_audience}進行優化。"
        )
      )
    , ( format!(
          "編輯並改進作家撰寫的關於\"{topic}\"的文章。\n\
           檢查以下內容：\n\
           - 語法和拼寫錯誤\n\
           - 內容準確性\n\
           - 結構和流程\n\
           - 風格一致性\n\
           - 可讀性\n\
           確保最終文章符合高標準的寫作質量。"
        )
      , format!(
          "經過專業編輯的最終版文章，\n\
           確保內容準確、風格一致且易於{target_audience}理解。"
        )
      )
    ]
}

fn english_tasks(
  topic: &str
, target_audience: &str
, word_count: usize
) -> TaskText
{   [
      ( format!(
          "Carry out in-depth research on the topic \"{topic}\".\n\
           Target audience: {target_audience}\n\
           Gather enough information to write a {word_count}-word \
           article.\n\
           Make sure the information is accurate, relevant and up to \
           date."
        )
      , format!(
          "A detailed research report on {topic}, including:\n\
           - Main concepts and definitions\n\
           - Key facts and data\n\
           - Relevant examples and case studies\n\
           - Current trends and developments"
        )
      )
    , ( format!(
          "Based on the research, write a {word_count}-word article \
           about \"{topic}\".\n\
           Target audience: {target_audience}\n\
           Make sure the content is:\n\
           - Clearly structured\n\
           - Accurate\n\
           - Engaging\n\
           - Suited to the needs of the target audience"
        )
      , format!(
          "A complete, well-structured {word_count}-word article \
           covering every important aspect of {topic}, optimised for \
           {target_audience}."
        )
      )
    , ( format!(
          "Edit and improve the writer's article about \"{topic}\".\n\
           Check for:\n\
           - Grammar and spelling errors\n\
           - Accuracy of content\n\
           - Structure and flow\n\
           - Consistency of style\n\
           - Readability\n\
           Make sure the final article meets a high standard of \
           writing quality."
        )
      , format!(
          "The professionally edited final article, accurate, \
           consistent in style and easy for {target_audience} to \
           understand."
        )
      )
    ]
}

/// First `max_chars` characters followed by `...`
pub fn preview(text: &str, max_chars: usize) -> String
{   let mut head: String = text.chars().take(max_chars).collect();
    head.push_str("...");
    head
}

/// Write the article as UTF-8 text and return its preview
pub async fn save_article(article: &CrewOutput, path: &Path)
  -> Result<String, Error>
{   tokio::fs::write(path, article.to_string())
      .await
      .map_err(|e| {
        error!("Failed to write {}: {}", path.display(), e);
        Error::OutputError(format!("{}: {}", path.display(), e))
      })?;
    debug!("Wrote {} bytes to {}", article.raw.len(), path.display());
    Ok(preview(&article.raw, PREVIEW_CHARS))
}
