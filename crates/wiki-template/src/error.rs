use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Render(#[from] handlebars::RenderError),

    #[error(transparent)]
    Template(#[from] handlebars::TemplateError),

    #[error("{0} requires an identifier argument that does not normalize")]
    InvalidIdentifierArgument(&'static str),
}
