//! User-facing replies

use super::state::{SearchMode, SearchRequest, DATE_EXAMPLE, DATE_FORMAT};
use std::fmt;

/// Everything the bot can say. Rendered to French text through `Display`.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Help,
    AskType,
    AskRadius,
    /// Contextual re-prompt after an invalid radius
    AskRadiusAgain,
    AskPosition,
    AskWindowStart,
    AskWindowEnd,
    /// Contextual re-prompt after an end date not after the start date
    WindowInverted,
    SearchStarted(SearchRequest),
    /// `/recommencer` outside of `EndSearch`
    RepeatUnavailable,
    /// Generic fallback for any unmatched state/input pair
    NotUnderstood,
    Found { count: u32 },
    SearchFailed,
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Help => f.write_str(
                "Écrire:\n\
                 /chercher pour initier une nouvelle recherche.\n\
                 /recommencer pour redémarrer une recherche avec les mêmes paramètres que la recherche précédente.",
            ),
            Reply::AskType => f.write_str(
                "Bonjour ! Tapez :\n\
                 - station pour rechercher une Communauto en station.\n\
                 - flex pour rechercher un véhicule Communauto Flex.",
            ),
            Reply::AskRadius => f.write_str("Quelle est votre distance de recherche en kilomètres ?"),
            Reply::AskRadiusAgain => f.write_str("Veuillez entrer un rayon de recherche correct."),
            Reply::AskPosition => {
                f.write_str("Veuillez partager votre position pour votre recherche.")
            }
            Reply::AskWindowStart => write!(
                f,
                "Quelle est la date et l'heure de début de la location au format {DATE_EXAMPLE} ?"
            ),
            Reply::AskWindowEnd => write!(
                f,
                "Quelle est la date et l'heure de fin de la location au format {DATE_EXAMPLE} ?"
            ),
            Reply::WindowInverted => write!(
                f,
                "La fin de la location doit être après son début. \
                 Quelle est la date et l'heure de fin de la location au format {DATE_EXAMPLE} ?"
            ),
            Reply::SearchStarted(request) => write_search_started(f, request),
            Reply::RepeatUnavailable => {
                f.write_str("Veuillez initier une nouvelle recherche avant de la redémarrer.")
            }
            Reply::NotUnderstood => f.write_str("Je n'ai pas bien compris. 😕"),
            Reply::Found { count } => write!(
                f,
                "💡 Trouvé ! {count} véhicule(s) disponible(s) selon vos critères de recherche."
            ),
            Reply::SearchFailed => f.write_str(
                "😞 Une erreur est survenue dans vos critères de recherche. \
                 Veuillez lancer une nouvelle recherche.",
            ),
        }
    }
}

fn write_search_started(f: &mut fmt::Formatter<'_>, request: &SearchRequest) -> fmt::Result {
    write!(
        f,
        "🔍 Recherche d'un véhicule {} dans un rayon de {}km autour de la position que vous avez entrée",
        request.mode.label(),
        format_km(request.radius_km)
    )?;
    if let (SearchMode::ByStation, Some(window)) = (request.mode, &request.window) {
        write!(
            f,
            ", du {} au {}",
            window.start().format(DATE_FORMAT),
            window.end().format(DATE_FORMAT)
        )?;
    }
    f.write_str(". Vous recevrez un message lorsque l'un sera trouvé.")
}

/// Whole kilometres print without decimals, anything else with one
fn format_km(radius_km: f64) -> String {
    let rounded = radius_km.round();
    if (radius_km - rounded).abs() < 0.05 {
        format!("{rounded:.0}")
    } else {
        format!("{radius_km:.1}")
    }
}
