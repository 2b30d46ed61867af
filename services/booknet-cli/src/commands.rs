//! Command execution
//!
//! Each command checks the session guard (signed in, admin where needed),
//! calls the API and renders text to the given writer. API errors are turned
//! into their user-facing message here.

use std::io::Write;

use anyhow::{Context, anyhow};
use booknet_api::Result as ApiResult;
use booknet_api::models::{Author, AuthorInput, BookInput, GenreInput};
use booknet_api::users::UserInput;
use booknet_api::{ApiClient, Book, Genre, ListQuery, Page};
use booknet_api::{authors, books, genres, home, interactions, profile, ratings, tags, users};
use booknet_auth::{LoginForm, ProfileUpdateForm, RegistrationForm, UserProfile};
use clap::Args;
use common::Secret;
use tracing::debug;

use crate::args::{
    BooksCommand, Command, Crud, ProfileChanges, ProfileCommand, TagsCommand, UserFields,
};
use crate::error::Error;
use crate::session::SessionContext;
use crate::view;

/// Source of passwords: environment first, then an interactive prompt.
pub trait Prompt {
    fn secret(&mut self, label: &str, env_var: &str) -> std::io::Result<String>;
}

/// Reads passwords from env vars or the terminal with echo turned off.
pub struct TerminalPrompt;

impl Prompt for TerminalPrompt {
    fn secret(&mut self, label: &str, env_var: &str) -> std::io::Result<String> {
        if let Ok(value) = std::env::var(env_var) {
            return Ok(value);
        }
        rpassword::prompt_password(format!("{label}: "))
    }
}

/// Map an API error to something worth printing.
fn user_error(e: booknet_api::Error) -> anyhow::Error {
    match e {
        booknet_api::Error::SessionExpired => Error::SessionExpired.into(),
        other => anyhow!(other.user_message()),
    }
}

fn auth_error(e: booknet_auth::Error) -> anyhow::Error {
    user_error(booknet_api::Error::from(e))
}

/// Execute one command against a started session.
pub async fn run(
    ctx: &SessionContext,
    command: Command,
    prompt: &mut impl Prompt,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let state = ctx.state();
    if !command.is_public() && !state.is_authenticated {
        return Err(Error::NotLoggedIn.into());
    }
    if command.requires_admin() && !state.is_admin() {
        return Err(Error::AdminRequired.into());
    }
    debug!(?command, "running command");

    let client = ctx.client();
    match command {
        Command::Login { username } => {
            let password = prompt.secret("Password", "BOOKNET_PASSWORD")?;
            let user = ctx
                .login(&LoginForm::new(username, password))
                .await
                .map_err(auth_error)?;
            writeln!(out, "Welcome back, {}!", user.display_name())?;
        }
        Command::Register {
            username,
            email,
            first_name,
            last_name,
        } => {
            let password = prompt.secret("Password", "BOOKNET_PASSWORD")?;
            let confirm = match std::env::var("BOOKNET_PASSWORD") {
                Ok(_) => password.clone(),
                Err(_) => prompt.secret("Confirm password", "BOOKNET_PASSWORD_CONFIRM")?,
            };
            let form = RegistrationForm {
                username,
                email,
                password: password.into(),
                confirm_password: confirm.into(),
                first_name,
                last_name,
            };
            let strength = form.validate().map_err(auth_error)?;
            let user = ctx.register(&form).await.map_err(auth_error)?;
            writeln!(out, "Welcome to BookNet, {}!", user.display_name())?;
            writeln!(out, "Password strength: {}", strength.label())?;
        }
        Command::Logout => {
            ctx.logout().await.map_err(auth_error)?;
            writeln!(out, "Logged out")?;
        }
        Command::Whoami => {
            let user = profile::get_profile(client).await.map_err(user_error)?;
            writeln!(out, "{}", view::user(&user))?;
        }
        Command::Home => {
            let feed = home::load_home(client).await.map_err(user_error)?;
            write!(out, "{}", view::home(&feed))?;
        }
        Command::Books(cmd) => run_books(client, cmd, out).await?,
        Command::Ratings { book_id, page } => {
            let page = ratings::get_book_ratings(client, book_id, &page.query())
                .await
                .map_err(user_error)?;
            for rating in &page.items {
                writeln!(out, "{}", view::rating_line(rating))?;
            }
            writeln!(out, "{}", view::page_footer(&page))?;
        }
        Command::Rate {
            book_id,
            stars,
            review,
        } => {
            interactions::rate_book(client, book_id, stars, review.as_deref())
                .await
                .map_err(user_error)?;
            writeln!(out, "Rated book {book_id} {stars}/5")?;
        }
        Command::Authors(op) => crud::<Authors, _>(client, op, AuthorInput::from, out).await?,
        Command::Genres(op) => crud::<Genres, _>(client, op, GenreInput::from, out).await?,
        Command::Tags(op) => match op {
            TagsCommand::List(args) => {
                let page = tags::list_tags(client, &args.query()).await.map_err(user_error)?;
                for tag in &page.items {
                    writeln!(out, "{}", view::tag(tag))?;
                }
                writeln!(out, "{}", view::page_footer(&page))?;
            }
            TagsCommand::Create { name } => {
                let tag = tags::create_tag(client, &name).await.map_err(user_error)?;
                writeln!(out, "Created {}", view::tag(&tag))?;
            }
            TagsCommand::Delete { id } => {
                tags::delete_tag(client, id).await.map_err(user_error)?;
                writeln!(out, "Deleted tag {id}")?;
            }
        },
        Command::Users(op) => {
            let password: Option<Secret<String>> = match op {
                Crud::Create(_) => Some(
                    prompt
                        .secret("Password for new user", "BOOKNET_NEW_PASSWORD")?
                        .into(),
                ),
                _ => None,
            };
            crud::<Users, _>(client, op, |fields: UserFields| fields.into_input(password), out).await?
        }
        Command::Profile(ProfileCommand::Show) => {
            let user = profile::get_profile(client).await.map_err(user_error)?;
            writeln!(out, "{}", view::user(&user))?;
            if let Some(created) = &user.created_at {
                writeln!(out, "Member since {created}")?;
            }
        }
        Command::Profile(ProfileCommand::Update(changes)) => {
            let form = profile_form(changes, prompt)?;
            let user = profile::update_profile(client, &form)
                .await
                .map_err(user_error)?;
            writeln!(out, "Profile updated: {}", view::user(&user))?;
        }
    }
    Ok(())
}

fn profile_form(changes: ProfileChanges, prompt: &mut impl Prompt) -> anyhow::Result<ProfileUpdateForm> {
    let mut form = ProfileUpdateForm {
        username: changes.username,
        email: changes.email,
        first_name: changes.first_name,
        last_name: changes.last_name,
        ..Default::default()
    };
    if changes.change_password {
        form.new_password = Some(prompt.secret("New password", "BOOKNET_NEW_PASSWORD")?.into());
        form.confirm_password =
            Some(prompt.secret("Confirm new password", "BOOKNET_NEW_PASSWORD_CONFIRM")?.into());
    }
    form.current_password =
        Some(prompt.secret("Current password", "BOOKNET_PASSWORD")?.into());
    Ok(form)
}

async fn run_books(
    client: &ApiClient,
    cmd: BooksCommand,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    match cmd {
        BooksCommand::Upload { file } => {
            let bytes = tokio::fs::read(&file)
                .await
                .with_context(|| format!("failed to read {}", file.display()))?;
            let file_name = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let report = books::bulk_upload(client, &file_name, bytes)
                .await
                .map_err(user_error)?;
            writeln!(out, "Created {} book(s), {} failed", report.created, report.failed)?;
            for error in &report.errors {
                writeln!(out, "  {error}")?;
            }
        }
        BooksCommand::Crud(Crud::Show { id }) => {
            let book = books::get_book(client, id).await.map_err(user_error)?;
            write!(out, "{}", view::book_detail(&book))?;
            let (page, distribution) = ratings::community_ratings(client, id)
                .await
                .map_err(user_error)?;
            writeln!(out, "\nCommunity ratings")?;
            write!(out, "{}", view::distribution(&distribution))?;
            for rating in page.items.iter().filter(|r| r.review.is_some()).take(5) {
                writeln!(out, "  {}", view::rating_line(rating))?;
            }
        }
        BooksCommand::Crud(op) => crud::<Books, _>(client, op, BookInput::from, out).await?,
    }
    Ok(())
}

/// A catalog resource with the usual five operations.
trait Catalog {
    type Item;
    type Input;

    async fn list(client: &ApiClient, query: &ListQuery) -> ApiResult<Page<Self::Item>>;
    async fn show(client: &ApiClient, id: i64) -> ApiResult<Self::Item>;
    async fn create(client: &ApiClient, input: &Self::Input) -> ApiResult<Self::Item>;
    async fn update(client: &ApiClient, id: i64, input: &Self::Input) -> ApiResult<Self::Item>;
    async fn delete(client: &ApiClient, id: i64) -> ApiResult<()>;
    fn render(item: &Self::Item) -> String;
}

macro_rules! catalog {
    ($name:ident, $item:ty, $input:ty, $module:ident, $list:ident, $get:ident, $create:ident, $update:ident, $delete:ident, $render:path) => {
        struct $name;

        impl Catalog for $name {
            type Item = $item;
            type Input = $input;

            async fn list(client: &ApiClient, query: &ListQuery) -> ApiResult<Page<$item>> {
                $module::$list(client, query).await
            }
            async fn show(client: &ApiClient, id: i64) -> ApiResult<$item> {
                $module::$get(client, id).await
            }
            async fn create(client: &ApiClient, input: &$input) -> ApiResult<$item> {
                $module::$create(client, input).await
            }
            async fn update(client: &ApiClient, id: i64, input: &$input) -> ApiResult<$item> {
                $module::$update(client, id, input).await
            }
            async fn delete(client: &ApiClient, id: i64) -> ApiResult<()> {
                $module::$delete(client, id).await
            }
            fn render(item: &$item) -> String {
                $render(item)
            }
        }
    };
}

catalog!(Books, Book, BookInput, books, list_books, get_book, create_book, update_book, delete_book, view::book_line);
catalog!(Authors, Author, AuthorInput, authors, list_authors, get_author, create_author, update_author, delete_author, view::author);
catalog!(Genres, Genre, GenreInput, genres, list_genres, get_genre, create_genre, update_genre, delete_genre, view::genre);
catalog!(Users, UserProfile, UserInput, users, list_users, get_user, create_user, update_user, delete_user, view::user);

/// Run one catalog operation; `into_input` turns parsed fields into the
/// request payload for create and update.
async fn crud<C: Catalog, F: Args>(
    client: &ApiClient,
    op: Crud<F>,
    into_input: impl FnOnce(F) -> C::Input,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    match op {
        Crud::List(args) => {
            let page = C::list(client, &args.query()).await.map_err(user_error)?;
            for item in &page.items {
                writeln!(out, "{}", C::render(item))?;
            }
            writeln!(out, "{}", view::page_footer(&page))?;
        }
        Crud::Show { id } => {
            let item = C::show(client, id).await.map_err(user_error)?;
            writeln!(out, "{}", C::render(&item))?;
        }
        Crud::Create(fields) => {
            let item = C::create(client, &into_input(fields)).await.map_err(user_error)?;
            writeln!(out, "Created {}", C::render(&item))?;
        }
        Crud::Update { id, fields } => {
            let item = C::update(client, id, &into_input(fields)).await.map_err(user_error)?;
            writeln!(out, "Updated {}", C::render(&item))?;
        }
        Crud::Delete { id } => {
            C::delete(client, id).await.map_err(user_error)?;
            writeln!(out, "Deleted {id}")?;
        }
    }
    Ok(())
}
