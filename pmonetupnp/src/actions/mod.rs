//! Actions UPnP et leurs arguments.
//!
//! Une [`Action`] est décrite dans le SCPD d'un service. Elle porte une
//! liste ordonnée d'[`Argument`] dont les valeurs sont toujours stockées
//! sous forme textuelle.
//!
//! Côté point de contrôle, une action est clonée depuis l'arbre de
//! description, ses arguments d'entrée sont renseignés, puis
//! [`Action::post`] l'invoque sur le device distant :
//!
//! ```ignore
//! let mut action = service.action_by_name("SetTarget")?.clone();
//! action.set_argument_bool("newTargetValue", true)?;
//! action.post()?;
//! ```

mod action_control;
mod action_methods;
mod argument_methods;
pub mod errors;

use std::sync::Arc;

pub use argument_methods::parse_bool;
pub use errors::{ActionError, ArgumentValueError};

use crate::services::ServiceLink;

pub const DIRECTION_IN: &str = "in";
pub const DIRECTION_OUT: &str = "out";

/// Sens d'un argument.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Direction {
    #[default]
    Unknown = 0,
    In = 1,
    Out = 2,
}

/// Argument d'action.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Argument {
    name: String,
    direction: Direction,
    related_state_variable: String,
    value: String,
    action: Option<String>,
}

/// Action d'un service UPnP.
///
/// Le lien vers le service propriétaire est posé par le service lui-même
/// lors de l'ajout ou du chargement du SCPD.
#[derive(Debug, Clone, Default)]
pub struct Action {
    name: String,
    arguments: Vec<Argument>,
    service: Option<Arc<ServiceLink>>,
}
