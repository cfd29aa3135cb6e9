use asteroid_core::types::Identity;

/// The three astronauts registered when the config declares none.
pub fn default_roster() -> Vec<Identity> {
    vec![
        astronaut(
            "agent-1",
            "You are a 41 year old astronaut with great strength and more experience than \
             the rest of the crew. You break problems into clear steps and answer with \
             strong reasoning in one or two lines.",
            10.0,
            4.0,
            6.0,
        ),
        astronaut(
            "agent-2",
            "You are a 23 year old astronaut from Nigeria who grew up in Africa's jungles. \
             You think outside the box and find approaches others miss, answering in one \
             or two lines.",
            5.0,
            8.0,
            10.0,
        ),
        astronaut(
            "agent-3",
            "You are a 32 year old astronaut, proud and self-assured. You look for the most \
             straightforward solution that can actually be carried out, answering in one \
             or two lines.",
            4.0,
            10.0,
            5.0,
        ),
    ]
}

fn astronaut(id: &str, role: &str, strength: f64, intelligence: f64, survival: f64) -> Identity {
    let attributes = [
        ("strength", strength),
        ("intelligence", intelligence),
        ("survivalInstincts", survival),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect();
    Identity::new(id, role, attributes)
}
