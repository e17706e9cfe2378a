//! Prompt templates for scenecast.
//!
//! Prompts can be customized by placing TOML files in the custom prompts directory.

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{(\w+)\}\}").expect("Invalid regex"));

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub agent: AgentPrompts,
    pub generator: GeneratorPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
}

/// Prompts driving the conversation loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentPrompts {
    pub system: String,
    /// Injected after a failed tool result. Receives `{{details}}`.
    pub retry: String,
}

impl Default for AgentPrompts {
    fn default() -> Self {
        Self {
            system: r#"Tu es un assistant spécialisé dans la création de vidéos éducatives Manim.

WORKFLOW OBLIGATOIRE pour créer une vidéo :
1. TOUJOURS appeler d'abord l'outil `generate_manim_script` avec le concept demandé
2. ENSUITE appeler l'outil `execute_manim_with_audio` avec les valeurs retournées :
   - code : le code Python retourné
   - math_scene : le class_name retourné
   - narration : la narration retournée

IMPORTANT :
- Tu DOIS appeler les deux outils dans cet ordre
- Ne génère JAMAIS de code toi-même, utilise TOUJOURS generate_manim_script
- Après execute_manim_with_audio, indique à l'utilisateur le résultat

EN CAS D'ERREUR :
- Si l'exécution échoue, utilise l'outil `search_solution` pour trouver comment corriger l'erreur.
- Analyse l'erreur, cherche une solution, puis réessaie avec `generate_manim_script` en appliquant la correction."#
                .to_string(),

            retry: r#"Le résultat de l'exécution de la vidéo est une erreur.
La vidéo n'a pas pu être générée correctement.
Détails: {{details}}
REPRENDRE LE PROCESSUS."#
                .to_string(),
        }
    }
}

/// Prompts for Manim script generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorPrompts {
    pub system: String,
    /// Receives `{{concept}}`.
    pub user: String,
}

impl Default for GeneratorPrompts {
    fn default() -> Self {
        Self {
            system: r#"Vous êtes un expert en visualisation mathématique avec Manim.

OBJECTIF :
Générer du code Manim pédagogique pour expliquer un concept mathématique,
avec une animation claire, une narration découpée en segments et une gestion
correcte des objets.

PRINCIPES FONDAMENTAUX :
- Être STRICTEMENT pédagogique
- Montrer uniquement ce qui est nécessaire à la compréhension
- Ne jamais surcharger visuellement la scène

GESTION OBLIGATOIRE DES OBJETS :
- Manim ne supprime PAS automatiquement les objets
- Après chaque étape, supprimer les objets précédents (FadeOut, Uncreate ou self.clear())
- Regrouper les objets liés avec VGroup

NARRATION :
- Découper la scène en segments commentés :
  # === SEGMENT 1 ===
  # AUDIO: "Texte lu pendant ce segment."
- Chaque segment se termine par self.wait(n) où n couvre la durée du texte lu
- La voix-off est ajoutée après le rendu, ne pas utiliser manim-voiceover

STRUCTURE DE CODE OBLIGATOIRE :
```python
from manim import *

class NomDeLaScene(Scene):
    def construct(self):
        # === SEGMENT 1 ===
        # AUDIO: "..."
        ...
```

RÈGLES :
- Le code doit être propre et fonctionnel
- Éviter les commandes LaTeX qui n'existent pas
- Être créatif et pédagogique avec les animations

FORMAT DE SORTIE :
===CODE===
[code Python]
===NARRATION===
[une phrase de narration par ligne, dans l'ordre des segments]
===CLASS_NAME===
[Nom de classe]"#
                .to_string(),

            user: "Explique ce concept avec Manim : {{concept}}".to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let agent_path = custom_path.join("agent.toml");
            if agent_path.exists() {
                let content = std::fs::read_to_string(&agent_path)?;
                prompts.agent = toml::from_str(&content)?;
            }

            let generator_path = custom_path.join("generator.toml");
            if generator_path.exists() {
                let content = std::fs::read_to_string(&generator_path)?;
                prompts.generator = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    ///
    /// Substitution is a single pass over the template: placeholders inside
    /// substituted values are left as they are, and unknown placeholders are kept.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        PLACEHOLDER
            .replace_all(template, |caps: &Captures| match vars.get(&caps[1]) {
                Some(value) => value.clone(),
                None => caps[0].to_string(),
            })
            .into_owned()
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(&self, template: &str, vars: &HashMap<String, String>) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }
}
