//! Command-line definitions
//!
//! `--config` and `--json` are global and may appear anywhere on the line.
//! Catalog resources share one `Crud` shape; each supplies its own field set.

use std::path::PathBuf;

use booknet_api::ListQuery;
use booknet_api::models::{AuthorInput, BookInput, GenreInput};
use booknet_api::users::UserInput;
use booknet_auth::Role;
use clap::{Args, Parser, Subcommand, ValueEnum};
use common::Secret;

/// BookNet command-line client
#[derive(Debug, Parser)]
#[command(name = "booknet", version)]
#[command(about = "Browse, rate and manage the BookNet catalog", long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Config file (default: $BOOKNET_CONFIG, then ./booknet.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, PartialEq, Subcommand)]
pub enum Command {
    /// Log in; the password comes from BOOKNET_PASSWORD or a hidden prompt
    Login { username: String },
    /// Create an account and log in
    Register {
        username: String,
        email: String,
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
    },
    /// Revoke the session and forget the stored tokens
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Newest, top rated and per-genre carousels
    Home,
    /// Browse books; create, update, delete and upload need ADMIN
    #[command(subcommand)]
    Books(BooksCommand),
    /// List the ratings of one book
    Ratings {
        book_id: i64,
        #[command(flatten)]
        page: PageArgs,
    },
    /// Rate a book from 1 to 5 stars
    Rate {
        book_id: i64,
        stars: u8,
        #[arg(long)]
        review: Option<String>,
    },
    /// Browse authors; changes need ADMIN
    #[command(subcommand)]
    Authors(Crud<AuthorFields>),
    /// Browse genres; changes need ADMIN
    #[command(subcommand)]
    Genres(Crud<GenreFields>),
    /// Browse tags; create and delete need ADMIN
    #[command(subcommand)]
    Tags(TagsCommand),
    /// Manage accounts (ADMIN)
    #[command(subcommand)]
    Users(Crud<UserFields>),
    /// Show or edit your own profile
    #[command(subcommand)]
    Profile(ProfileCommand),
}

impl Command {
    /// Whether the command needs the admin role.
    pub fn requires_admin(&self) -> bool {
        match self {
            Command::Users(_) => true,
            Command::Books(BooksCommand::Upload { .. }) => true,
            Command::Books(BooksCommand::Crud(op)) => op.mutates(),
            Command::Authors(op) => op.mutates(),
            Command::Genres(op) => op.mutates(),
            Command::Tags(op) => !matches!(op, TagsCommand::List(_)),
            _ => false,
        }
    }

    /// Whether the command works without a session.
    pub fn is_public(&self) -> bool {
        matches!(
            self,
            Command::Login { .. } | Command::Register { .. } | Command::Logout
        )
    }
}

/// The five catalog operations over a resource's field set `F`.
#[derive(Debug, PartialEq, Subcommand)]
pub enum Crud<F: Args> {
    List(ListArgs),
    Show {
        id: i64,
    },
    Create(F),
    Update {
        id: i64,
        #[command(flatten)]
        fields: F,
    },
    Delete {
        id: i64,
    },
}

impl<F: Args> Crud<F> {
    fn mutates(&self) -> bool {
        !matches!(self, Crud::List(_) | Crud::Show { .. })
    }
}

#[derive(Debug, PartialEq, Subcommand)]
pub enum BooksCommand {
    /// Bulk-create books from a .csv or .json file
    Upload { file: PathBuf },
    #[command(flatten)]
    Crud(Crud<BookFields>),
}

#[derive(Debug, PartialEq, Subcommand)]
pub enum TagsCommand {
    List(ListArgs),
    Create { name: String },
    Delete { id: i64 },
}

#[derive(Debug, PartialEq, Subcommand)]
pub enum ProfileCommand {
    Show,
    /// Change profile fields; always asks for the current password
    Update(ProfileChanges),
}

#[derive(Debug, Clone, Default, PartialEq, Args)]
pub struct PageArgs {
    #[arg(long)]
    pub limit: Option<u32>,
    #[arg(long)]
    pub offset: Option<u32>,
}

impl PageArgs {
    pub fn query(&self) -> ListQuery {
        ListQuery {
            limit: self.limit,
            offset: self.offset,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Args)]
pub struct ListArgs {
    #[arg(long)]
    pub search: Option<String>,
    /// Genre id
    #[arg(long)]
    pub genre: Option<i64>,
    /// Author id
    #[arg(long)]
    pub author: Option<i64>,
    /// e.g. `createdAt,desc`
    #[arg(long)]
    pub sort: Option<String>,
    #[command(flatten)]
    pub page: PageArgs,
}

impl ListArgs {
    pub fn query(&self) -> ListQuery {
        ListQuery {
            search: self.search.clone(),
            sort: self.sort.clone(),
            genre: self.genre,
            author: self.author,
            ..self.page.query()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Args)]
pub struct BookFields {
    #[arg(long)]
    pub title: String,
    #[arg(long)]
    pub isbn: Option<String>,
    #[arg(long = "year")]
    pub publication_year: Option<i32>,
    #[arg(long = "pages")]
    pub page_count: Option<u32>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub language: Option<String>,
    #[arg(long)]
    pub cover_url: Option<String>,
    /// Author ids, comma separated or repeated
    #[arg(long = "author", value_delimiter = ',')]
    pub author_ids: Vec<i64>,
    #[arg(long = "genre", value_delimiter = ',')]
    pub genre_ids: Vec<i64>,
    #[arg(long = "tag", value_delimiter = ',')]
    pub tag_ids: Vec<i64>,
}

impl From<BookFields> for BookInput {
    fn from(f: BookFields) -> Self {
        BookInput {
            title: f.title,
            description: f.description,
            isbn: f.isbn,
            publication_year: f.publication_year,
            page_count: f.page_count,
            language: f.language,
            cover_url: f.cover_url,
            author_ids: f.author_ids,
            genre_ids: f.genre_ids,
            tag_ids: f.tag_ids,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Args)]
pub struct AuthorFields {
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub bio: Option<String>,
    #[arg(long)]
    pub birth_year: Option<i32>,
    #[arg(long)]
    pub nationality: Option<String>,
}

impl From<AuthorFields> for AuthorInput {
    fn from(f: AuthorFields) -> Self {
        AuthorInput {
            name: f.name,
            bio: f.bio,
            birth_year: f.birth_year,
            nationality: f.nationality,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Args)]
pub struct GenreFields {
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub description: Option<String>,
}

impl From<GenreFields> for GenreInput {
    fn from(f: GenreFields) -> Self {
        GenreInput {
            name: f.name,
            description: f.description,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum RoleArg {
    #[default]
    User,
    Admin,
}

impl From<RoleArg> for Role {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::User => Role::User,
            RoleArg::Admin => Role::Admin,
        }
    }
}

/// Account fields. The password is prompted for, never taken from argv.
#[derive(Debug, Clone, Default, PartialEq, Args)]
pub struct UserFields {
    #[arg(long)]
    pub username: String,
    #[arg(long)]
    pub email: String,
    #[arg(long, value_enum, ignore_case = true, default_value_t = RoleArg::User)]
    pub role: RoleArg,
    #[arg(long)]
    pub first_name: Option<String>,
    #[arg(long)]
    pub last_name: Option<String>,
}

impl UserFields {
    pub fn into_input(self, password: Option<Secret<String>>) -> UserInput {
        UserInput {
            username: self.username,
            email: self.email,
            password,
            role: self.role.into(),
            first_name: self.first_name,
            last_name: self.last_name,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Args)]
pub struct ProfileChanges {
    #[arg(long)]
    pub username: Option<String>,
    #[arg(long)]
    pub email: Option<String>,
    #[arg(long)]
    pub first_name: Option<String>,
    #[arg(long)]
    pub last_name: Option<String>,
    /// Also set a new password (prompted)
    #[arg(long = "password")]
    pub change_password: bool,
}
