#![allow(dead_code)]

pub mod fake_loaders;
pub mod mock_sender;

use schemawatch::{CommitInfo, PushEvent, Repository, RepositoryOwner};

pub const SCHEMA_PATH: &str = "schema.graphql";
pub const BEFORE: &str = "aaaaaaa";

pub const SCHEMA_V1: &str = r#"
type Query {
  user(id: ID!): User
}

type User {
  id: ID!
  name: String
  email: String
}
"#;

pub const SCHEMA_V2: &str = r#"
type Query {
  user(id: ID!): User
  users(first: Int): [User!]!
}

type User {
  id: ID!
  name: String
}
"#;

/// Builds a push event for `acme/api` with one commit.
pub fn push_event(git_ref: &str) -> PushEvent {
    PushEvent {
        git_ref: git_ref.to_string(),
        before: BEFORE.to_string(),
        after: "bbbbbbb".to_string(),
        repository: Repository {
            name: "api".to_string(),
            owner: RepositoryOwner {
                login: Some("acme".to_string()),
                name: None,
            },
        },
        commits: Some(vec![CommitInfo {
            id: Some("bbbbbbb".to_string()),
            message: Some("Update schema".to_string()),
        }]),
    }
}
