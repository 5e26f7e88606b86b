use std::{sync::Arc, time::Duration};
use tokio::sync::Mutex;

use indicatif::{ProgressBar, ProgressStyle};

pub mod util {
    use dialoguer::{theme::ColorfulTheme, Confirm};
    use std::io;

    fn theme() -> ColorfulTheme {
        ColorfulTheme::default()
    }

    pub fn ask_yes_no(prompt: &str) -> io::Result<bool> {
        Confirm::with_theme(&theme())
            .with_prompt(prompt)
            .default(false)
            .interact()
    }
}

pub trait SpinnerExt {
    fn with_ticking(self) -> Arc<Mutex<Self>>;
}

impl SpinnerExt for ProgressBar {
    fn with_ticking(self) -> Arc<Mutex<Self>> {
        let mutex_spinner = Arc::new(Mutex::new(self));
        let spinner = mutex_spinner.clone();
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(Duration::from_millis(30)).await;
                let spinner = spinner.lock().await;
                if spinner.is_finished() {
                    break;
                }
                spinner.tick();
            }
        });
        mutex_spinner
    }
}

/// Spinner shown next to a status line such as `Compiling 'main.cpp'...`.
pub fn status_spinner(msg: impl Into<String>) -> Arc<Mutex<ProgressBar>> {
    let style = ProgressStyle::default_spinner()
        .template("{msg} {spinner}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    ProgressBar::new_spinner()
        .with_style(style)
        .with_message(msg.into())
        .with_ticking()
}
