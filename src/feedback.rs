//! Speed-bracket presentation payloads carried by `update` messages. The
//! receiver renders these verbatim.

/// Encouragement line for the current speed.
pub fn quote_for(wpm: u32) -> &'static str {
    if wpm < 10 {
        "🐢 Slow and steady wins the race..."
    } else if wpm < 20 {
        "🌱 Warming up... keep those keys moving!"
    } else if wpm < 35 {
        "🚶 Steady and focused — you're getting there!"
    } else if wpm < 50 {
        "🏃 Nice flow! You're typing like a pro."
    } else if wpm < 65 {
        "⚡ Speedy fingers! Keep up the great momentum!"
    } else {
        "🚀 Typing master unlocked! You're on fire!"
    }
}

/// Animation asset name for the current speed.
pub fn animation_file_for(wpm: u32) -> &'static str {
    if wpm < 10 {
        "slow1.json"
    } else if wpm < 20 {
        "slow2.json"
    } else if wpm < 30 {
        "medium1.json"
    } else if wpm < 40 {
        "medium2.json"
    } else if wpm < 50 {
        "fast1.json"
    } else {
        "fast2.json"
    }
}

/// Background gradient for the current speed.
pub fn color_for(wpm: u32) -> &'static str {
    if wpm < 10 {
        "linear-gradient(45deg, #FFD1D1, #FFE5E5)"
    } else if wpm < 20 {
        "linear-gradient(45deg, #FFFACD, #FFF5B7)"
    } else if wpm < 35 {
        "linear-gradient(45deg, #DFFFD6, #E8FFE0)"
    } else if wpm < 50 {
        "linear-gradient(45deg, #D6F6FF, #E0FCFF)"
    } else if wpm < 65 {
        "linear-gradient(45deg, #EAD9FF, #F3E8FF)"
    } else {
        "linear-gradient(45deg, #FFD9F7, #FFE0FA)"
    }
}
