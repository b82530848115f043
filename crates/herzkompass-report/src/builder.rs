// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Paragraph builder.
//!
//! Turns the raw questionnaire answer map into the German report paragraphs.
//! Closed-choice answers go through small vocabulary tables; free-text
//! answers are cleaned up (underscores to spaces) and framed in fixed copy.
//!
//! A paragraph is only emitted when at least one of its answers resolved;
//! there is no filler copy. Unknown vocabulary values resolve to nothing
//! rather than erroring, so a stale funnel can never break rendering.

use serde_json::Value;

use crate::blocks::{BlockKey, BlockMap};

/// Build report paragraphs from a questionnaire answer map.
///
/// The input is the order's `answers` object; non-object input yields an
/// empty map. The result is deterministic for identical input.
pub fn build_blocks(answers: &Value) -> BlockMap {
    let mut blocks = BlockMap::new();

    let name = answer(answers, "user_name").or_else(|| answer(answers, "name"));
    let longing = answer(answers, "deepestLonging").map(|v| v.replace('-', " "));
    let gender_pref = answer(answers, "genderPreference").and_then(|v| nice_gender_pref(&v));
    let closeness =
        answer(answers, "dailyClosenessImportance").and_then(|v| nice_closeness(&v));
    let conflict = answer(answers, "conflictBehavior").and_then(|v| nice_conflict(&v));
    let wrong_pattern =
        answer(answers, "wrongPartnerPattern").and_then(|v| nice_wrong_pattern(&v));
    let loved_freq = answer(answers, "giveVsReceive")
        .or_else(|| answer(answers, "feelingLoved"))
        .and_then(|v| nice_freq(&v));

    // Free-text recommendation steps.
    let s21 = step(answers, "step21_answer");
    let s22 = step(answers, "step22_answer");
    let s23 = step(answers, "step23_answer");
    let s24 = step(answers, "step24_answer");
    let s25 = step(answers, "step25_answer");
    let s26 = step(answers, "step26_answer");
    let s27 = step(answers, "step27_answer");

    if let Some(name) = &name {
        blocks.insert(
            BlockKey::Begruessung1,
            format!(
                "Hallo {}! Hier ist deine persönliche Dating-Analyse – klar, ehrlich und auf den Punkt.",
                cap(name)
            ),
        );
    }

    let mut analyse1 = Vec::new();
    if let Some(longing) = &longing {
        analyse1.push(format!(
            "Im Kern sehnst du dich nach {longing}. Dieses Bedürfnis ist ein verlässlicher \
             Kompass dafür, welche Menschen dir wirklich guttun."
        ));
    }
    if let Some(closeness) = &closeness {
        analyse1.push(format!(
            "Nähe hat für dich {closeness}. Das heißt: Du brauchst einen Menschen, der Nähe \
             ähnlich bewertet – sonst entsteht langfristig Reibung."
        ));
    }
    insert_joined(&mut blocks, BlockKey::Analyse1, analyse1);

    let mut analyse2 = Vec::new();
    if let Some(conflict) = &conflict {
        analyse2.push(format!(
            "Im Umgang mit Konflikten neigst du dazu, {conflict}. Das ist wichtig zu wissen – \
             denn die beste Beziehung ist nicht die konfliktfreie, sondern die mit einer \
             reifen Streitkultur."
        ));
    }
    if let Some(freq) = &loved_freq {
        analyse2.push(format!(
            "Zuneigung erlebst du {freq}. Das solltest du bewusst einfordern: klare Worte, \
             kleine Gesten und Verbindlichkeit helfen dir am meisten."
        ));
    }
    insert_joined(&mut blocks, BlockKey::Analyse2, analyse2);

    if let Some(pref) = &gender_pref {
        let mut fakten = vec![format!("Partnerpräferenz: {pref}.")];
        if let Some(longing) = &longing {
            fakten.push(format!("Zentraler Fokus: {longing}."));
        }
        insert_joined(&mut blocks, BlockKey::Fakten1, fakten);
    }

    if let Some(s21) = &s21 {
        blocks.insert(
            BlockKey::Staerken1,
            format!(
                "Eine deiner Stärken: {s21}. Sie gibt dir Orientierung in Gesprächen und \
                 hilft dir, dich nicht zu verstellen."
            ),
        );
        blocks.insert(
            BlockKey::Empfehlung1,
            format!(
                "Fokussiere in den ersten Gesprächen gezielt das Thema \"{s21}\". \
                 Formulierungen wie „Mir ist wichtig, dass…“ oder „Ich merke, dass ich mich \
                 wohlfühle, wenn…“ schaffen Offenheit ohne Druck."
            ),
        );
    }

    if let Some(s22) = &s22 {
        blocks.insert(
            BlockKey::Schwaechen1,
            format!(
                "Wachstumsfeld: {s22}. Es lohnt sich, genau hier bewusste kleine Schritte zu \
                 gehen – mit realistischen Erwartungen an dich selbst."
            ),
        );
        blocks.insert(
            BlockKey::Empfehlung2,
            format!(
                "Setze eine klare Grenze bei \"{s22}\". Wenn das Gegenüber ausweicht, \
                 freundlich beenden – das schützt Zeit und Herz."
            ),
        );
    }

    if let Some(pattern) = &wrong_pattern {
        blocks.insert(
            BlockKey::Ergebnis,
            format!(
                "Kurzfazit: Wenn du deine Bedürfnisse klar benennst und bei ersten Signalen \
                 konsequent bleibst, ziehst du die Menschen an, die wirklich zu dir passen. \
                 Achte besonders darauf, Muster zu durchbrechen: Du tendierst dazu, {pattern}. \
                 Setze dir hier bewusste Grenzen."
            ),
        );
    }

    if let Some(s23) = &s23 {
        blocks.insert(
            BlockKey::Empfehlung3,
            format!(
                "Bringe \"{s23}\" aktiv in Dates ein: kurze, ehrliche Sätze und echte \
                 Neugier. Das trennt früh die Spreu vom Weizen."
            ),
        );
    }

    if let Some(s24) = &s24 {
        blocks.insert(
            BlockKey::Zukunft1,
            format!(
                "Der nächste wirksame Schritt: {s24}. Plane dafür bewusst Zeit ein \
                 (z. B. wöchentlich 60 Minuten) – kleine Rituale erzeugen große Wirkung."
            ),
        );
    }

    if let Some(s25) = &s25 {
        blocks.insert(
            BlockKey::Zukunft2,
            format!(
                "Außerdem hilfreich: {s25}. Halte nach 14 Tagen fest, was sich spürbar \
                 verändert hat – Fortschritt motiviert."
            ),
        );
    }

    if let Some(s26) = &s26 {
        blocks.insert(
            BlockKey::Abschluss,
            format!(
                "Zum Schluss: {s26}. Erlaube dir, genau so aufzutreten – echt, freundlich \
                 und klar."
            ),
        );
    }

    if let Some(s27) = &s27 {
        blocks.insert(
            BlockKey::Wuensche,
            format!(
                "Mein Wunsch für dich: {s27}. Und ganz praktisch: heute eine kleine Sache \
                 tun, die dich innerlich aufrichtet."
            ),
        );
    }

    blocks
}

fn insert_joined(blocks: &mut BlockMap, key: BlockKey, sentences: Vec<String>) {
    if !sentences.is_empty() {
        blocks.insert(key, sentences.join(" "));
    }
}

/// Non-empty string answer, trimmed.
fn answer(answers: &Value, key: &str) -> Option<String> {
    let text = answers.get(key)?.as_str()?.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

/// Free-text step answer with underscores turned into spaces.
fn step(answers: &Value, key: &str) -> Option<String> {
    answer(answers, key).map(|v| v.replace('_', " "))
}

/// Capitalize the first letter.
fn cap(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

// ----------------------------------------------------------------------
// Vocabulary tables for closed-choice answers. Unknown values resolve to
// None; the funnel occasionally ships new values before the copy does.
// ----------------------------------------------------------------------

fn nice_freq(v: &str) -> Option<&'static str> {
    match v.to_lowercase().as_str() {
        "sehr-oft" | "sehr_oft" => Some("sehr häufig"),
        "oft" => Some("oft"),
        "manchmal" => Some("manchmal"),
        "selten" => Some("selten"),
        "nie" => Some("so gut wie nie"),
        _ => None,
    }
}

fn nice_closeness(v: &str) -> Option<&'static str> {
    match v.to_lowercase().as_str() {
        "hoch" | "wichtig" | "sehr_wichtig" => Some("eine hohe Bedeutung"),
        "mittel" | "mittelmäßig" => Some("eine gewisse Bedeutung"),
        "weniger-wichtig" | "weniger_wichtig" => Some("keine übermäßige Bedeutung"),
        _ => None,
    }
}

fn nice_gender_pref(v: &str) -> Option<&'static str> {
    match v.to_lowercase().as_str() {
        "frauen" => Some("Frauen"),
        "maenner" | "männer" => Some("Männer"),
        "divers" => Some("diverse Personen"),
        _ => None,
    }
}

fn nice_conflict(v: &str) -> Option<&'static str> {
    match v.to_lowercase().as_str() {
        "kaempfen" | "kämpfen" => Some("Konflikte eher konfrontativ zu lösen"),
        "frieden-machen" | "frieden_machen" => Some("schnell wieder Frieden herzustellen"),
        "bereuen" => {
            Some("Dinge zu bereuen und es beim nächsten Mal besser machen zu wollen")
        }
        _ => None,
    }
}

fn nice_wrong_pattern(v: &str) -> Option<&'static str> {
    match v.to_lowercase().as_str() {
        "manchmal" => Some("manchmal auf Menschen zu setzen, die langfristig nicht gut passen"),
        "oft" => Some(
            "häufig auf Partner:innen zu treffen, die nicht zu deinen Bedürfnissen passen",
        ),
        _ => None,
    }
}
