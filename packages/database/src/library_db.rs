//! Reference-text library storage.

use duckdb::Connection;
use precinct_map_database_models::LawArticle;

use crate::DbError;

/// Inserts articles. Returns the number of rows inserted.
///
/// # Errors
///
/// Returns [`DbError`] if any insert fails (including a duplicate id).
pub fn insert_articles(conn: &Connection, articles: &[LawArticle]) -> Result<u64, DbError> {
    let mut stmt =
        conn.prepare("INSERT INTO law_articles (id, chapter, title, body) VALUES (?, ?, ?, ?)")?;

    let mut inserted = 0u64;
    for article in articles {
        stmt.execute(duckdb::params![
            article.id,
            article.chapter,
            article.title,
            article.body,
        ])?;
        inserted += 1;
    }

    log::debug!("Inserted {inserted} law articles");
    Ok(inserted)
}

/// Deletes every article.
///
/// # Errors
///
/// Returns [`DbError`] if the delete fails.
pub fn delete_articles(conn: &Connection) -> Result<usize, DbError> {
    Ok(conn.execute("DELETE FROM law_articles", [])?)
}

/// Looks up one article by id.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn get_article(conn: &Connection, id: &str) -> Result<Option<LawArticle>, DbError> {
    let mut stmt = conn.prepare("SELECT id, chapter, title, body FROM law_articles WHERE id = ?")?;
    let result = stmt.query_row([id], |row| {
        Ok(LawArticle {
            id: row.get(0)?,
            chapter: row.get(1)?,
            title: row.get(2)?,
            body: row.get(3)?,
        })
    });
    match result {
        Ok(article) => Ok(Some(article)),
        Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(DbError::DuckDb(e)),
    }
}

/// Number of stored articles.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn count_articles(conn: &Connection) -> Result<u64, DbError> {
    crate::zones_db::count(conn, "SELECT COUNT(*) FROM law_articles")
}
