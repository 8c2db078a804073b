/// Relevance weights, in score points. The sum exceeds the 100-point
/// ceiling on purpose: profile-quality bonuses are additive headroom and the
/// final score is clamped.
pub const RELEVANCE_WEIGHTS: ScoreWeights = ScoreWeights {
    skills: 35.0,
    location: 15.0,
    experience: 15.0,
    salary: 10.0,
    education: 10.0,
    designation: 8.0,
    company: 5.0,
    notice_period: 4.0,
    profile_quality: 8.0,
};

#[derive(Debug, Clone, Copy)]
pub struct ScoreWeights {
    pub skills: f64,
    pub location: f64,
    pub experience: f64,
    pub salary: f64,
    pub education: f64,
    pub designation: f64,
    pub company: f64,
    pub notice_period: f64,
    pub profile_quality: f64,
}

impl ScoreWeights {
    pub fn sum(&self) -> f64 {
        self.skills
            + self.location
            + self.experience
            + self.salary
            + self.education
            + self.designation
            + self.company
            + self.notice_period
            + self.profile_quality
    }
}
