use std::path::PathBuf;

use clap::Parser;
use log::error;

use writing_crew::writing::{save_article, Language};
use writing_crew::{Error, GeminiLlm, Settings, WritingAssistantCrew};

#[derive(Parser)]
#[command(name = "writing-crew")]
#[command(about = "Research, write and edit an article with Gemini")]
#[command(version)]
struct Cli
{   /// Article topic (defaults to a topic in the chosen language)
    #[arg(long)]
    topic: Option<String>

  , /// Who the article is written for
    #[arg(long)]
    audience: Option<String>

  , /// Language of the agent instructions (zh-TW or en)
    #[arg(short, long, default_value_t = Language::TraditionalChinese)]
    language: Language

  , /// Target length in words
    #[arg(long, default_value_t = writing_crew::writing::DEFAULT_WORD_COUNT)]
    word_count: usize

  , /// Where to write the finished article
    #[arg(short, long, default_value = "generated_article.md")]
    output: PathBuf

  , /// Gemini model (overrides GEMINI_MODEL)
    #[arg(short, long)]
    model: Option<String>
}

#[tokio::main]
async fn main()
{   dotenvy::dotenv().ok();
    env_logger::Builder::from_env(
      env_logger::Env::default().default_filter_or("info")
    ).init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await
    {   error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Error>
{   let mut settings = Settings::from_env()?;
    if let Some(model) = cli.model
    {   settings = settings.with_model(model);
    }

    let topic = cli.topic
      .unwrap_or_else(|| cli.language.default_topic().to_string());
    let audience = cli.audience
      .unwrap_or_else(|| cli.language.default_audience().to_string());

    let llm = GeminiLlm::from_settings(&settings);
    let crew = WritingAssistantCrew::with_language(cli.language);

    println!("Generating an article about '{}'...", topic);

    let article = crew
      .create_article(&llm, &topic, &audience, cli.word_count)
      .await?;

    let preview = save_article(&article, &cli.output).await?;

    println!(
      "\nArticle generated and saved to {}",
      cli.output.display()
    );
    println!("\nPreview:");
    println!("{}", preview);
    Ok(())
}
