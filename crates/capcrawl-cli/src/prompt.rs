//! Console yes/no questions.

use std::io::{self, BufRead, Write};

use async_trait::async_trait;
use capcrawl_core::review::is_affirmative;
use capcrawl_core::{CrawlError, Result, ReviewContext, ReviewPrompt};

/// Print `question` and read one answer line; `y`/`Y` means yes.
pub fn confirm(question: &str) -> io::Result<bool> {
    let mut stdout = io::stdout().lock();
    write!(stdout, "{question} (Y/N): ")?;
    stdout.flush()?;
    drop(stdout);

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(is_affirmative(&answer))
}

/// Asks the user on stdin/stdout
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsolePrompt;

#[async_trait]
impl ReviewPrompt for ConsolePrompt {
    async fn ask(&self, context: &ReviewContext) -> Result<bool> {
        let context = context.clone();
        let inspection = context.inspection_path.clone();

        let answer = tokio::task::spawn_blocking(move || {
            println!(
                "\n{}\nS{} EP{} {}",
                context.series_name, context.season, context.episode_number, context.title
            );
            confirm(&format!(
                "\nIs {} a closed caption?",
                context.inspection_path.display()
            ))
        })
        .await
        .map_err(|e| CrawlError::io(&inspection, io::Error::other(e)))?;

        answer.map_err(|e| CrawlError::io(inspection, e))
    }
}
