use crate::models::{has_rating, Dataset, EmailDraft, Movie};

const APP_NAME: &str = "MovieScout";

/// Renders a dataset's list as a shareable email draft
///
/// Returns `None` when there is nothing to share.
pub fn compose_email(dataset: Dataset, movies: &[Movie]) -> Option<EmailDraft> {
    if movies.is_empty() {
        return None;
    }

    let list_name = dataset.list_name();
    let mut body = format!(
        "Here is the {} list generated by {}:\n\n",
        list_name, APP_NAME
    );

    for (i, movie) in movies.iter().enumerate() {
        body.push_str(&format!("{}. {} ({})\n", i + 1, movie.title, movie.language));
        if has_rating(&movie.rotten_tomatoes) {
            body.push_str(&format!("   🍅 RT: {}\n", movie.rotten_tomatoes));
        }
        if has_rating(&movie.imdb) {
            body.push_str(&format!("   ⭐ IMDb: {}\n", movie.imdb));
        }
        body.push_str(&format!("   📺 Where: {}\n", movie.availability));
        body.push_str(&format!("   📝 {}\n\n", movie.summary));
    }

    body.push_str(&format!("\nShared via {}", APP_NAME));

    Some(EmailDraft {
        subject: format!("{}: {}", APP_NAME, list_name),
        body,
    })
}
