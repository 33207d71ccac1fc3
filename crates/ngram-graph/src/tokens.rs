//! Token store: text to id interning, word flags, and stems.

use rusqlite::{OptionalExtension, params, params_from_iter};
use tracing::debug;

use graph_core::TokenId;

use crate::{Graph, StoreError};

/// A row of the `tokens` table.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Token {
    pub id: TokenId,
    pub text: String,
    pub is_word: bool,
}

/// A token is a word when it holds at least one word character.
pub(crate) fn is_word(text: &str) -> bool {
    text.chars().any(|c| c.is_alphanumeric() || c == '_')
}

impl Graph {
    /// Look up a token by its exact text.
    pub fn token_id(&self, text: &str) -> Result<Option<TokenId>, StoreError> {
        let mut stmt = self.conn.prepare_cached("SELECT id FROM tokens WHERE text = ?1")?;
        Ok(stmt
            .query_row(params![text], |row| row.get::<_, i64>(0))
            .optional()?
            .map(TokenId))
    }

    /// Look up a token, creating it when `create` is set.
    ///
    /// Returns `None` only when the token is absent and `create` is false.
    pub fn get_token_by_text(
        &self,
        text: &str,
        create: bool,
        stemmer: Option<&dyn Fn(&str) -> String>,
    ) -> Result<Option<TokenId>, StoreError> {
        if create {
            self.get_or_create_token(text, stemmer).map(Some)
        } else {
            self.token_id(text)
        }
    }

    /// Return the id for `text`, inserting a new token if needed.
    ///
    /// A new token's stem is recorded when a stemmer is given and it produces
    /// a non-blank stem.
    pub fn get_or_create_token(
        &self,
        text: &str,
        stemmer: Option<&dyn Fn(&str) -> String>,
    ) -> Result<TokenId, StoreError> {
        if let Some(id) = self.token_id(text)? {
            return Ok(id);
        }

        self.atomically(|g| {
            let mut stmt = g
                .conn
                .prepare_cached("INSERT INTO tokens (text, is_word) VALUES (?1, ?2)")?;
            stmt.execute(params![text, is_word(text)])?;
            let id = TokenId(g.conn.last_insert_rowid());

            if let Some(stem) = stemmer.map(|s| s(text)) {
                if !stem.trim().is_empty() {
                    g.insert_stem(id, &stem)?;
                }
            }
            Ok(id)
        })
    }

    /// Fetch a full token row.
    pub fn token(&self, id: TokenId) -> Result<Option<Token>, StoreError> {
        Ok(self
            .conn
            .query_row(
                "SELECT text, is_word FROM tokens WHERE id = ?1",
                params![id.get()],
                |row| {
                    Ok(Token {
                        id,
                        text: row.get(0)?,
                        is_word: row.get(1)?,
                    })
                },
            )
            .optional()?)
    }

    pub fn token_text(&self, id: TokenId) -> Result<Option<String>, StoreError> {
        Ok(self.token(id)?.map(|t| t.text))
    }

    /// The subset of `ids` that exist and are word tokens, in id order.
    pub fn filter_word_tokens(&self, ids: &[TokenId]) -> Result<Vec<TokenId>, StoreError> {
        self.filter_tokens(ids, " AND is_word = 1")
    }

    /// The subset of `ids` that exist, in id order.
    pub fn filter_known_tokens(&self, ids: &[TokenId]) -> Result<Vec<TokenId>, StoreError> {
        self.filter_tokens(ids, "")
    }

    fn filter_tokens(&self, ids: &[TokenId], condition: &str) -> Result<Vec<TokenId>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; ids.len()].join(",");
        let sql = format!(
            "SELECT id FROM tokens WHERE id IN ({placeholders}){condition} ORDER BY id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let found = stmt
            .query_map(params_from_iter(ids.iter().map(|id| id.get())), |row| {
                row.get::<_, i64>(0)
            })?
            .map(|r| r.map(TokenId))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(found)
    }

    /// Record a stem for a token.
    pub fn insert_stem(&self, token: TokenId, stem: &str) -> Result<(), StoreError> {
        let mut stmt = self
            .conn
            .prepare_cached("INSERT INTO token_stems (token_id, stem) VALUES (?1, ?2)")?;
        stmt.execute(params![token.get(), stem])?;
        Ok(())
    }

    /// Every token sharing `stem`, in id order.
    pub fn token_ids_with_stem(&self, stem: &str) -> Result<Vec<TokenId>, StoreError> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT token_id FROM token_stems WHERE stem = ?1 ORDER BY token_id")?;
        let ids = stmt
            .query_map(params![stem], |row| row.get::<_, i64>(0))?
            .map(|r| r.map(TokenId))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    /// Drop the stem indexes and delete every stem row.
    pub fn delete_token_stems(&self) -> Result<(), StoreError> {
        debug!("deleting token stems");
        self.conn.execute_batch(
            "DROP INDEX IF EXISTS token_stems_stem;
             DROP INDEX IF EXISTS token_stems_id;
             DELETE FROM token_stems;",
        )?;
        Ok(())
    }

    /// Stem every existing token and index the result.
    pub fn update_token_stems(&self, stemmer: &dyn Fn(&str) -> String) -> Result<(), StoreError> {
        self.atomically(|g| {
            let rows = {
                let mut stmt = g.conn.prepare("SELECT id, text FROM tokens ORDER BY id")?;
                stmt.query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))?
                    .collect::<Result<Vec<_>, _>>()?
            };

            let mut stemmed = 0usize;
            for (id, text) in rows {
                let stem = stemmer(&text);
                if !stem.trim().is_empty() {
                    g.insert_stem(TokenId(id), &stem)?;
                    stemmed += 1;
                }
            }
            debug!(stemmed, "stemmed existing tokens");

            g.conn.execute_batch(
                "CREATE INDEX IF NOT EXISTS token_stems_id ON token_stems (token_id);
                 CREATE INDEX IF NOT EXISTS token_stems_stem ON token_stems (stem);",
            )?;
            Ok(())
        })
    }
}
