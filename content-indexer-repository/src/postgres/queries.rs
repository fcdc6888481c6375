//! SQL statements against the `content` schema.
//!
//! Batch queries take `$1 = since`, `$2 = exclude ids`, `$3 = limit` and
//! order by `(COALESCE(modified, created), id)`. Paging is keyset based: the
//! next page starts after the last row's timestamp and ids.

pub const FILM_WORK_BATCH: &str = r#"
SELECT
    fw.id,
    fw.title,
    fw.description,
    fw.rating::float8 AS rating,
    fw.type,
    fw.created,
    fw.modified,
    COALESCE(
        jsonb_agg(DISTINCT jsonb_build_object('id', p.id, 'name', p.full_name, 'role', pfw.role))
            FILTER (WHERE p.id IS NOT NULL),
        '[]'
    ) AS persons,
    COALESCE(
        jsonb_agg(DISTINCT jsonb_build_object('id', g.id, 'name', g.name))
            FILTER (WHERE g.id IS NOT NULL),
        '[]'
    ) AS genres
FROM content.film_work fw
LEFT JOIN content.person_film_work pfw ON pfw.film_work_id = fw.id
LEFT JOIN content.person p ON p.id = pfw.person_id
LEFT JOIN content.genre_film_work gfw ON gfw.film_work_id = fw.id
LEFT JOIN content.genre g ON g.id = gfw.genre_id
WHERE COALESCE(fw.modified, fw.created) > $1
   OR (COALESCE(fw.modified, fw.created) = $1 AND NOT (fw.id = ANY($2)))
GROUP BY fw.id
ORDER BY COALESCE(fw.modified, fw.created), fw.id
LIMIT $3
"#;

pub const FILM_WORK_BY_ID: &str = r#"
SELECT
    fw.id,
    fw.title,
    fw.description,
    fw.rating::float8 AS rating,
    fw.type,
    fw.created,
    fw.modified,
    COALESCE(
        jsonb_agg(DISTINCT jsonb_build_object('id', p.id, 'name', p.full_name, 'role', pfw.role))
            FILTER (WHERE p.id IS NOT NULL),
        '[]'
    ) AS persons,
    COALESCE(
        jsonb_agg(DISTINCT jsonb_build_object('id', g.id, 'name', g.name))
            FILTER (WHERE g.id IS NOT NULL),
        '[]'
    ) AS genres
FROM content.film_work fw
LEFT JOIN content.person_film_work pfw ON pfw.film_work_id = fw.id
LEFT JOIN content.person p ON p.id = pfw.person_id
LEFT JOIN content.genre_film_work gfw ON gfw.film_work_id = fw.id
LEFT JOIN content.genre g ON g.id = gfw.genre_id
WHERE fw.id = $1
GROUP BY fw.id
"#;

pub const GENRE_BATCH: &str = r#"
SELECT id, name, description, created, modified
FROM content.genre
WHERE COALESCE(modified, created) > $1
   OR (COALESCE(modified, created) = $1 AND NOT (id = ANY($2)))
ORDER BY COALESCE(modified, created), id
LIMIT $3
"#;

pub const GENRE_BY_ID: &str = r#"
SELECT id, name, description, created, modified
FROM content.genre
WHERE id = $1
"#;

pub const PERSON_BATCH: &str = r#"
SELECT id, full_name, created, modified
FROM content.person
WHERE COALESCE(modified, created) > $1
   OR (COALESCE(modified, created) = $1 AND NOT (id = ANY($2)))
ORDER BY COALESCE(modified, created), id
LIMIT $3
"#;

pub const PERSON_BY_ID: &str = r#"
SELECT id, full_name, created, modified
FROM content.person
WHERE id = $1
"#;

pub const FILMS_BY_GENRE: &str = r#"
SELECT DISTINCT gfw.film_work_id
FROM content.genre_film_work gfw
WHERE gfw.genre_id = $1
"#;

pub const FILMS_BY_PERSON: &str = r#"
SELECT DISTINCT pfw.film_work_id
FROM content.person_film_work pfw
WHERE pfw.person_id = $1
"#;

pub const FILM_BY_GENRE_LINK: &str = r#"
SELECT film_work_id FROM content.genre_film_work WHERE id = $1
"#;

pub const FILM_BY_PERSON_LINK: &str = r#"
SELECT film_work_id FROM content.person_film_work WHERE id = $1
"#;

/// Trigger functions and row triggers publishing change notifications.
///
/// `{channel}` is replaced with a validated channel identifier.
pub const TRIGGERS: &str = include_str!("../../sql/triggers.sql");
