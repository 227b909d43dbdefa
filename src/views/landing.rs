use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct Feature {
    pub title: &'static str,
    pub description: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct LandingContent {
    pub features: Vec<Feature>,
    pub highlights: Vec<Feature>,
}

const FEATURES: [Feature; 6] = [
    Feature {
        title: "Gestion des Utilisateurs",
        description: "Gérez facilement étudiants, enseignants et directeurs avec des profils complets et des droits d'accès personnalisés.",
    },
    Feature {
        title: "Tableau de Bord Analytique",
        description: "Visualisez les performances et statistiques en temps réel avec des graphiques interactifs et des rapports détaillés.",
    },
    Feature {
        title: "Gestion des Notes",
        description: "Système complet de notation avec calculs automatiques, bulletins personnalisables et suivi des progrès.",
    },
    Feature {
        title: "Suivi des Présences",
        description: "Enregistrement digital des présences avec notifications automatiques et rapports d'assiduité.",
    },
    Feature {
        title: "Centre de Communication",
        description: "Plateforme de communication intégrée pour faciliter les échanges entre tous les acteurs éducatifs.",
    },
    Feature {
        title: "Gestion des Ressources",
        description: "Organisez et partagez les ressources pédagogiques, devoirs et documents administratifs.",
    },
];

const HIGHLIGHTS: [Feature; 3] = [
    Feature {
        title: "Sécurisé",
        description: "Protection des données avec chiffrement avancé",
    },
    Feature {
        title: "Support 24/7",
        description: "Assistance technique disponible en permanence",
    },
    Feature {
        title: "Disponibilité 99.9%",
        description: "Infrastructure cloud haute performance",
    },
];

pub fn landing_content() -> LandingContent {
    LandingContent {
        features: FEATURES.to_vec(),
        highlights: HIGHLIGHTS.to_vec(),
    }
}
