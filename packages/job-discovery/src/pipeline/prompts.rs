//! Question templates sent to the classifier.

use crate::types::config::{Language, TargetProfile};

fn profile_line(profile: &TargetProfile) -> String {
    let label = match profile.language() {
        Language::Fr => "Description de mon travail idéal",
        Language::En => "Description of my ideal job",
    };
    format!("{label}: \"{}\".", profile.description())
}

/// One question covering a whole batch of names, answered positionally.
pub fn batch_question<S: AsRef<str>>(profile: &TargetProfile, names: &[S]) -> String {
    let (instruction, list_intro) = match profile.language() {
        Language::Fr => (
            "Je vais t'envoyer une liste de noms d'offres d'emploi. Pour chacun de ces noms et uniquement eux, en respectant leur ordre, dis-moi si tu penses que l'offre me correspond en répondant uniquement par 1 pour oui, -1 pour non et 0 pour ne sait pas.",
            "Voici la liste, dont chaque valeur est contenue entre guillemets et toutes les valeurs sont séparées par une virgule",
        ),
        Language::En => (
            "I am going to send you a job opportunities name list. For each of them and strictly them, respecting their order, tell me if you think the offer corresponds to me by answering only with 1 for yes, -1 for no and 0 for don't know.",
            "Here's the list, in which items are enclosed by quotes and separated by a comma",
        ),
    };

    let names = names
        .iter()
        .map(|name| format!("\"{}\"", name.as_ref()))
        .collect::<Vec<_>>()
        .join(",");

    format!("{}\n{instruction} {list_intro}:\n{names}", profile_line(profile))
}

/// Yes/no question about one full description.
pub fn description_question(profile: &TargetProfile, description: &str) -> String {
    let instruction = match profile.language() {
        Language::Fr => "En répondant uniquement par 1 pour oui ou -1 pour non, dis-moi si la description d'un poste suivante me correspond",
        Language::En => "By answering only with either 1 for yes or -1 for no, tell me if the following job description fits me",
    };

    let collapsed = description.split_whitespace().collect::<Vec<_>>().join(" ");
    format!("{}\n{instruction}: \"{collapsed}\".", profile_line(profile))
}
