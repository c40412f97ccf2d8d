use crate::models::QuestionKey;

pub struct Category {
    pub name: &'static str,
    pub questions: &'static [QuestionKey],
}

/// Declaration order is the label order of every per-category output.
/// The distribution view uses these names too, rather than its older
/// longer labels ("Establishing Ongoing Partnership", "Deliberating On
/// Options", "Deciding And Acting On Decision").
pub static CATEGORIES: [Category; 4] = [
    Category {
        name: "Establishing Partnership",
        questions: &[QuestionKey::nth(1), QuestionKey::nth(2)],
    },
    Category {
        name: "Exchanging Information",
        questions: &[QuestionKey::nth(3), QuestionKey::nth(4), QuestionKey::nth(5)],
    },
    Category {
        name: "Deliberating on Options",
        questions: &[QuestionKey::nth(6), QuestionKey::nth(7), QuestionKey::nth(8)],
    },
    Category {
        name: "Deciding and Acting",
        questions: &[QuestionKey::nth(9), QuestionKey::nth(10)],
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    Patient,
    Oncologist,
}

impl Audience {
    pub fn heading(self) -> &'static str {
        match self {
            Audience::Patient => "Patient Version",
            Audience::Oncologist => "Oncologist Version",
        }
    }
}

const PATIENT_WORDING: [&str; QuestionKey::COUNT] = [
    "My care team and I agreed on the main concern(s) and focus of the visit.",
    "My care team wanted to know how I want to be involved in making medical decisions.",
    "My care team told me about the different treatment options.",
    "My care team explained well the advantages and disadvantages of the treatment options.",
    "My care team helped me understand all the information.",
    "My care team asked me which treatment option I prefer.",
    "My care team wanted to know what was important to me when making the decision.",
    "My care team and I thoroughly weighed the different treatment options.",
    "My care team and I selected the next step in treatment together.",
    "My care team and I reached an agreement on how to proceed.",
];

const ONCOLOGIST_WORDING: [&str; QuestionKey::COUNT] = [
    "Our care team and the patient agree upon the main concern(s) and focus of the visit.",
    "Our care team wanted to know how the patient wants to be involved in making medical decisions.",
    "Our care team told the patient about the different treatment options.",
    "Our care team explained well the advantages and disadvantages of the treatment options.",
    "Our care team helped the patient understand all the information.",
    "Our care team asked the patient which treatment option they prefer.",
    "Our care team wanted to know what was important to the patient when making the decision.",
    "Our care team and the patient thoroughly weighed the different treatment options.",
    "Our care team and the patient selected the next step in treatment together.",
    "Our care team and the patient reached an agreement on how to proceed.",
];

pub fn wording(audience: Audience, key: QuestionKey) -> &'static str {
    let index = usize::from(key.number()) - 1;
    match audience {
        Audience::Patient => PATIENT_WORDING[index],
        Audience::Oncologist => ONCOLOGIST_WORDING[index],
    }
}

pub fn category_labels() -> Vec<String> {
    CATEGORIES.iter().map(|c| c.name.to_string()).collect()
}

pub fn question_labels() -> Vec<String> {
    QuestionKey::all().map(QuestionKey::chart_label).collect()
}

pub fn category_of(key: QuestionKey) -> Option<&'static Category> {
    CATEGORIES.iter().find(|c| c.questions.contains(&key))
}

/// `Establishing Partnership (Q1, Q2)`, the category axis label with its
/// questions spelled out.
pub fn annotated_category(category: &Category) -> String {
    let questions: Vec<String> = category
        .questions
        .iter()
        .map(|q| q.short_label())
        .collect();
    format!("{} ({})", category.name, questions.join(", "))
}
