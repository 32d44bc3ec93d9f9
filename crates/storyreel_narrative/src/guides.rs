//! Per-model prompting guides.
//!
//! A static table of formatting rules for the image and video models prompts
//! get adapted to. Lookup is by exact model identifier, then by the longest
//! registered prefix (`ltx2_custom` resolves to `ltx2`).

/// Prompting rules for one target model family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptGuide {
    model_name: &'static str,
    syntax_rules: &'static str,
    keywords: &'static str,
    negative_prompt: &'static str,
    pitfalls: &'static str,
    examples: &'static str,
    audio_guidance: Option<&'static str>,
}

impl PromptGuide {
    /// Display name of the model family.
    pub fn model_name(&self) -> &'static str {
        self.model_name
    }

    /// Negative-prompt advice, or a statement that they are unsupported.
    pub fn negative_prompt(&self) -> &'static str {
        self.negative_prompt
    }

    /// Soundtrack instructions for models that synthesize audio with video.
    pub fn audio_guidance(&self) -> Option<&'static str> {
        self.audio_guidance
    }

    /// Render the guide as a block for a system instruction.
    pub fn render(&self) -> String {
        let mut out = format!(
            "=== MODEL-SPECIFIC PROMPTING GUIDE ({}) ===\n\
             Follow these rules when adapting prompts for this model:\n\n\
             SYNTAX:\n{}\n\n\
             HIGH-IMPACT KEYWORDS (use when they fit):\n{}\n\n\
             NEGATIVE PROMPT GUIDANCE:\n{}\n\n\
             MISTAKES TO AVOID:\n{}\n\n\
             EXAMPLE TRANSFORMATIONS (match this style):\n{}",
            self.model_name,
            self.syntax_rules,
            self.keywords,
            self.negative_prompt,
            self.pitfalls,
            self.examples,
        );

        if let Some(audio) = self.audio_guidance {
            out.push_str("\n\nAUDIO (REQUIRED for this model):\n");
            out.push_str(audio);
        }
        out.push_str("\n=== END MODEL GUIDE ===");
        if self.audio_guidance.is_some() {
            out.push_str(
                "\nCRITICAL: this model builds its soundtrack from the prompt text. \
                 Every videoPrompt MUST end with 'Audio: ...' describing the sound.",
            );
        }
        out
    }
}

const WAN: PromptGuide = PromptGuide {
    model_name: "Wan 2.1 / 2.2",
    syntax_rules: "Write flowing descriptive sentences rather than tag lists. \
        Open with the camera move, follow with what the subject does, then the surroundings, \
        and close on light and atmosphere. Join clauses with commas.",
    keywords: "Camera: 'slow dolly in', 'smooth tracking shot', 'aerial wide', 'handheld close-up'\n\
        Motion: 'fluid', 'gentle sway', 'crisp motion'\n\
        Look: 'cinematic', 'photorealistic', 'film grain', 'shallow depth of field'\n\
        Light: 'golden hour', 'volumetric light', 'soft diffused light', 'backlit'",
    negative_prompt: "blurry, low quality, static frame, watermark, text overlay, distorted limbs, cartoon",
    pitfalls: "Keyword dumps degrade results; use sentences.\n\
        Describe the scene, not post-production ('color graded').\n\
        Hype words like 'masterpiece' or 'ultra-realistic' hurt rather than help.",
    examples: "BASIC: 'a man rows a boat'\n\
        ENHANCED: 'A slow tracking shot follows a man rowing a wooden boat across a glassy lake, \
        ripples spreading from each oar stroke, pale morning mist hanging over the water.'",
    audio_guidance: None,
};

const LTX2: PromptGuide = PromptGuide {
    model_name: "LTX-2",
    syntax_rules: "Describe the whole scene in long, connected sentences: subject, action, \
        camera movement, environment and light. Finish every prompt with 'Audio: ...' \
        because the model generates sound from the text.",
    keywords: "Camera: 'steadicam follow', 'slow push in', 'arc shot', 'crane overhead'\n\
        Motion: 'unhurried', 'measured', 'deliberate'\n\
        Environment: texture, depth, distance\n\
        Light: 'dappled', 'low-key', 'rim light', 'soft ambient'",
    negative_prompt: "jump cuts, frantic motion, compression artifacts, unnatural movement, frozen frame",
    pitfalls: "Leaving out the 'Audio:' sentence produces arbitrary music.\n\
        Clips need 8n+1 frames and at least 17 of them.\n\
        Very fast motion looks poor; favour calm cinematic pacing.",
    examples: "BASIC: 'a girl rides a bike'\n\
        ENHANCED: 'The camera glides alongside a girl pedalling down a tree-lined lane, \
        sunlight flickering through the leaves as her scarf trails behind her. \
        Audio: whirring bicycle chain, birdsong, light acoustic guitar.'",
    audio_guidance: Some(
        "The model renders a full soundtrack from the prompt. Make 'Audio: ...' the last \
        sentence of every video prompt.\n\
        - Name on-screen sounds first: footsteps, wind, rain, engines, crowds.\n\
        - Then the music mood: 'soft ambient score', 'tense strings', or 'no music'.\n\
        - Stay under 20 words.\n\
        - For quiet scenes: 'Audio: near silence, faint room tone, no music.'",
    ),
};

const HUNYUAN: PromptGuide = PromptGuide {
    model_name: "HunyuanVideo",
    syntax_rules: "Detailed prose: subject first, then action, then setting. \
        Mention light, mood and camera movement. Stay under 200 words.",
    keywords: "Camera: 'cinematic pan', 'close-up reveal', 'wide establishing shot'\n\
        Look: 'high detail', 'photorealistic', 'professional photography'\n\
        Light: 'natural light', 'studio lighting', 'moody'",
    negative_prompt: "low quality, deformed, blurry, watermark, text, oversaturated",
    pitfalls: "Over-specifying fights the model's strong defaults.\n\
        Contradictory lighting descriptions confuse it.",
    examples: "BASIC: 'a chef cooking'\n\
        ENHANCED: 'A chef in a white jacket tosses vegetables in a flaming wok, \
        warm tungsten light from the range hood glinting off steel counters.'",
    audio_guidance: None,
};

const FLUX2: PromptGuide = PromptGuide {
    model_name: "FLUX.2",
    syntax_rules: "Natural-language prose, not comma-separated tags. Weight syntax such as \
        (word:1.2) is not supported. Put the most important elements first: subject, action, \
        style, setting, lighting, atmosphere. HEX colour codes are understood. \
        This is a still-image model; leave out motion over time.",
    keywords: "Photo: 'shot on a full-frame mirrorless camera', 'clean and sharp', 'high dynamic range'\n\
        Vintage: 'analog film', 'Kodak Portra 400', 'early 2000s digicam'\n\
        Art: 'flat illustration', 'isometric 3D', 'art deco poster'\n\
        Light: golden hour, softbox, rim light, chiaroscuro\n\
        Composition: rule of thirds, shallow depth of field, macro, telephoto",
    negative_prompt: "Negative prompts are NOT supported. Describe only what should appear: \
        say 'sharp focus throughout' instead of 'no blur'.",
    pitfalls: "Tag lists perform worse than sentences.\n\
        Mixing incompatible styles ('photoreal' and 'watercolor') muddles the result.\n\
        Always name the light source.\n\
        Weight syntax is ignored.",
    examples: "BASIC: 'a teapot'\n\
        ENHANCED: 'A cast-iron teapot on a worn oak table, a thin ribbon of steam rising, \
        morning window light raking across the surface, quiet still-life photography.'",
    audio_guidance: None,
};

const FLUX1: PromptGuide = PromptGuide {
    model_name: "Flux.1",
    syntax_rules: "Descriptive sentences with a clear structure: subject, action, style, context. \
        Layering foreground, middle ground and background works well. No weight syntax. \
        Skip politeness ('please draw...'). Still images only; no temporal description.",
    keywords: "Style: photorealistic, cinematic, 3D render, anime, film grain\n\
        Light: golden hour, window light, studio lighting, rim light, volumetric\n\
        Motion in stills: motion blur, dynamic pose, frozen moment\n\
        Composition: close-up, wide angle, low angle, bokeh, rule of thirds",
    negative_prompt: "Negative prompts are NOT supported. State what you want: \
        'clear sky' rather than 'no clouds'.",
    pitfalls: "Quality tag stuffing ('best quality, 8k') does nothing useful.\n\
        'White background' tends to blur; prefer 'studio background'.\n\
        Without texture words (pores, fabric weave) surfaces look plastic.\n\
        Keep resolutions divisible by 16.",
    examples: "BASIC: 'a dog on a beach'\n\
        ENHANCED: 'A wet border collie mid-leap on a windswept beach, sand spraying from its paws, \
        low angle, shallow depth of field, late afternoon sun, editorial photography.'",
    audio_guidance: None,
};

static REGISTRY: &[(&str, &PromptGuide)] = &[
    ("t2v", &WAN),
    ("i2v", &WAN),
    ("t2v_1.3B", &WAN),
    ("i2v_2_2", &WAN),
    ("ti2v_2_2", &WAN),
    ("t2v_2_2", &WAN),
    ("ltx2", &LTX2),
    ("ltx2_distilled", &LTX2),
    ("ltx2_19B", &LTX2),
    ("ltxv_13B", &LTX2),
    ("hunyuan_1_5_t2v", &HUNYUAN),
    ("hunyuan_1_5_i2v", &HUNYUAN),
    ("hunyuan", &HUNYUAN),
    ("hunyuan_i2v", &HUNYUAN),
    ("flux2_dev", &FLUX2),
    ("flux2_klein_4b", &FLUX2),
    ("flux2_klein_9b", &FLUX2),
    ("flux", &FLUX1),
    ("flux_schnell", &FLUX1),
    ("flux_dev_kontext", &FLUX1),
];

/// Guide for a model identifier: exact match, else longest registered prefix.
///
/// # Examples
///
/// ```
/// use storyreel_narrative::guide_for;
///
/// assert_eq!(guide_for("ltx2_custom").unwrap().model_name(), "LTX-2");
/// assert_eq!(guide_for("flux2_klein_4b_fp8").unwrap().model_name(), "FLUX.2");
/// assert!(guide_for("sdxl").is_none());
/// ```
pub fn guide_for(model_id: &str) -> Option<&'static PromptGuide> {
    if model_id.is_empty() {
        return None;
    }
    if let Some((_, guide)) = REGISTRY.iter().find(|(key, _)| *key == model_id) {
        return Some(*guide);
    }
    REGISTRY
        .iter()
        .filter(|(key, _)| model_id.starts_with(key))
        .max_by_key(|(key, _)| key.len())
        .map(|(_, guide)| *guide)
}

/// Rendered guide text for a model, or `None` when no guide applies.
pub fn format_guide(model_id: &str) -> Option<String> {
    guide_for(model_id).map(PromptGuide::render)
}
