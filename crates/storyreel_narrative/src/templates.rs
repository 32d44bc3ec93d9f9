//! Offline story templates.
//!
//! Used when the inference service cannot produce beats. Each template belongs
//! to one genre and holds ten beats with a `{subject}` slot.

use rand::Rng;
use rand::distributions::{Distribution, WeightedIndex};
use storyreel_core::GenreWeights;
use tracing::{debug, warn};

/// Subject used when the concept is blank.
pub const PLACEHOLDER_SUBJECT: &str = "the hero";

const SUBJECT_SLOT: &str = "{subject}";

/// A fixed sequence of story beats for one genre.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoryTemplate {
    genre: &'static str,
    beats: &'static [&'static str],
}

impl StoryTemplate {
    /// Genre this template is sampled under.
    pub fn genre(&self) -> &'static str {
        self.genre
    }

    /// Beat patterns with the `{subject}` slot unfilled.
    pub fn beats(&self) -> &'static [&'static str] {
        self.beats
    }

    /// Fill the subject slot and produce exactly `count` beats.
    ///
    /// Past the last beat the sequence starts over, marked as a later
    /// continuation.
    ///
    /// # Examples
    ///
    /// ```
    /// use storyreel_narrative::templates;
    ///
    /// let beats = templates()[0].fill("a lighthouse keeper", 3);
    /// assert_eq!(beats.len(), 3);
    /// assert!(beats.iter().all(|b| b.contains("a lighthouse keeper")));
    /// ```
    pub fn fill(&self, subject: &str, count: usize) -> Vec<String> {
        let subject = match subject.trim() {
            "" => PLACEHOLDER_SUBJECT,
            s => s,
        };

        (0..count)
            .map(|i| {
                let beat = self.beats[i % self.beats.len()].replace(SUBJECT_SLOT, subject);
                if i < self.beats.len() {
                    beat
                } else {
                    format!("Later, {}", lowercase_first(&beat))
                }
            })
            .collect()
    }
}

fn lowercase_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

static TEMPLATES: &[StoryTemplate] = &[
    StoryTemplate {
        genre: "action",
        beats: &[
            "Aerial view of a rain-slick city at night as {subject} sprints across a rooftop",
            "Low angle shot of {subject} vaulting a gap between buildings, coat flaring",
            "Close-up of {subject} catching their breath behind a humming ventilation unit",
            "Wide shot of searchlights sweeping the street below while {subject} watches",
            "Tracking shot of {subject} sliding down a fire escape in a shower of sparks",
            "Over-the-shoulder shot of {subject} facing three figures in a narrow alley",
            "Slow-motion shot of {subject} ducking as a steel pipe swings past",
            "Handheld shot of {subject} racing a motorbike through a flooded tunnel",
            "Extreme close-up of {subject} gripping a stolen drive, knuckles bleeding",
            "Silhouette of {subject} on a bridge at dawn as sirens fade into the distance",
        ],
    },
    StoryTemplate {
        genre: "comedy",
        beats: &[
            "Bright wide shot of a tidy suburban kitchen as {subject} confidently opens a cookbook",
            "Medium shot of {subject} cracking an egg that misses the bowl entirely",
            "Close-up of a smoke alarm blinking while {subject} fans it with a frying pan",
            "Wide shot of {subject} chasing a runaway dog that has stolen a whole baguette",
            "Reaction shot of a neighbor peering over the fence at {subject} covered in flour",
            "Split-diopter shot of {subject} and the dog locked in a silent standoff",
            "Overhead shot of {subject} surrounded by a dozen failed cakes on the counter",
            "Quick push-in on {subject} as a brilliant and terrible idea arrives",
            "Medium shot of {subject} proudly presenting a lopsided cake to stunned guests",
            "Final wide shot of {subject} and the guests laughing as the cake slowly collapses",
        ],
    },
    StoryTemplate {
        genre: "drama",
        beats: &[
            "Wide establishing shot of a quiet farmhouse at dusk, {subject} alone on the porch",
            "Close-up of {subject} turning an old photograph over in weathered hands",
            "Medium shot of {subject} standing in a dusty childhood bedroom",
            "Long take of {subject} walking through an empty wheat field under grey skies",
            "Over-the-shoulder shot of {subject} hesitating before a ringing telephone",
            "Close-up of {subject} with tears catching the warm light of a table lamp",
            "Two-shot of {subject} and an estranged sibling sitting apart at a kitchen table",
            "Slow dolly toward {subject} as a long-held truth is finally spoken",
            "Medium shot of {subject} and the sibling sharing a tentative embrace",
            "Wide shot of {subject} watching the sunrise over the fields, shoulders finally relaxed",
        ],
    },
    StoryTemplate {
        genre: "horror",
        beats: &[
            "Wide shot of a fog-bound village road as {subject} arrives with a single suitcase",
            "Dim interior shot of {subject} lighting a candle in a shuttered cottage",
            "Close-up of {subject} noticing wet footprints leading toward the cellar door",
            "Low angle shot of the cellar stairs as {subject} descends with a trembling lantern",
            "Extreme close-up of {subject}'s eyes widening at a sound behind the wall",
            "Dutch angle shot of {subject} backing away from a mirror that shows no reflection",
            "Static wide shot of {subject} frozen in a doorway while a shape crosses the hall",
            "Handheld shot of {subject} fleeing through a forest of bare, twisting trees",
            "Close-up of {subject} clutching a rusted key beneath a flickering streetlamp",
            "Final shot of the cottage window where a pale face watches {subject} leave",
        ],
    },
    StoryTemplate {
        genre: "scifi",
        beats: &[
            "Establishing shot of a ring station orbiting a violet gas giant, {subject} at a viewport",
            "Medium shot of {subject} floating through a corridor lined with cold blue panels",
            "Close-up of {subject} decoding a signal on a flickering holographic display",
            "Wide shot of {subject} suiting up in an airlock bathed in amber warning light",
            "Tracking shot of {subject} drifting along the hull against a field of stars",
            "Point-of-view shot of {subject} discovering an alien structure on the station's underside",
            "Close-up of {subject}'s visor reflecting geometric patterns of light",
            "Wide shot of the structure unfolding around {subject} like a blooming flower",
            "Slow push-in on {subject} reaching out to touch a pulsing glyph",
            "Final wide shot of the station transformed as {subject} gazes at a new horizon",
        ],
    },
    StoryTemplate {
        genre: "romance",
        beats: &[
            "Soft wide shot of a seaside market at golden hour, {subject} browsing old records",
            "Medium shot of {subject} reaching for the same record as a stranger",
            "Close-up of {subject} laughing, sunlight catching stray strands of hair",
            "Tracking shot of {subject} and the stranger walking along the harbor wall",
            "Two-shot of {subject} sharing headphones on a bench as boats sway nearby",
            "Over-the-shoulder shot of {subject} watching the stranger sketch the sunset",
            "Close-up of {subject} finding a phone number tucked inside a record sleeve",
            "Rainy night shot of {subject} running through puddles toward a lit doorway",
            "Medium shot of {subject} and the stranger dancing slowly in a cramped kitchen",
            "Wide shot of {subject} and the stranger on the harbor wall as the morning ferry departs",
        ],
    },
    StoryTemplate {
        genre: "fantasy",
        beats: &[
            "Sweeping aerial shot of mist-covered mountains as {subject} crests a ridge",
            "Medium shot of {subject} entering a forest where lanterns hang from ancient trees",
            "Close-up of {subject} tracing glowing runes carved into a standing stone",
            "Wide shot of {subject} crossing a rope bridge above a roaring waterfall",
            "Low angle shot of a great winged creature landing before {subject}",
            "Two-shot of {subject} offering an open palm to the creature in silence",
            "Tracking shot of {subject} riding the creature through clouds tinted rose and gold",
            "Wide shot of a crumbling citadel as {subject} lands among broken spires",
            "Close-up of {subject} lifting a crown of woven silver branches",
            "Final wide shot of {subject} standing as light spreads across the kingdom below",
        ],
    },
    StoryTemplate {
        genre: "thriller",
        beats: &[
            "Wide shot of a glass office tower at night, {subject} the last one working",
            "Close-up of {subject} noticing a file that should not exist on the shared drive",
            "Medium shot of {subject} photographing documents with a shaking phone",
            "Over-the-shoulder shot of a security guard watching {subject} on a monitor",
            "Tracking shot of {subject} walking briskly through a parking garage",
            "Close-up of {subject}'s reflection in a car window, a figure approaching behind",
            "Wide shot of {subject} slipping onto a crowded subway train just as the doors close",
            "Medium shot of {subject} meeting a journalist in a dim all-night diner",
            "Extreme close-up of {subject} sliding a memory card across the table",
            "Final wide shot of {subject} walking into the morning crowd as headlines break",
        ],
    },
];

/// Every built-in template.
pub fn templates() -> &'static [StoryTemplate] {
    TEMPLATES
}

/// Pick one template, weighting each by its genre's weight.
///
/// Genres with weight 0 or absent from `weights` are excluded. If nothing has
/// weight, every template is equally likely. Weights are summed as `u64`, so
/// any combination of `u32` weights is valid.
pub fn sample_template<R: Rng + ?Sized>(weights: &GenreWeights, rng: &mut R) -> &'static StoryTemplate {
    let per_template = TEMPLATES
        .iter()
        .map(|t| weights.get(t.genre).copied().map_or(0, u64::from));

    let index = match WeightedIndex::new(per_template) {
        Ok(dist) => dist.sample(rng),
        Err(e) => {
            warn!(error = %e, "No genre carries weight; sampling templates uniformly");
            rng.gen_range(0..TEMPLATES.len())
        }
    };

    let template = &TEMPLATES[index];
    debug!(genre = template.genre, "Selected story template");
    template
}
