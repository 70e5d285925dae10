/// Operation allowance shared by every request during one frame.
#[derive(Debug, Clone)]
pub struct FrameBudget {
    total: u32,
    remaining: u32,
    expansions: u32,
}

impl FrameBudget {
    pub fn new(total: u32) -> Self {
        Self { total, remaining: total, expansions: 0 }
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Units consumed this frame, successor expansions and reload charges alike.
    pub fn spent(&self) -> u32 {
        self.total - self.remaining
    }

    /// Successor expansions performed this frame.
    pub fn expansions(&self) -> u32 {
        self.expansions
    }

    /// Sub-budget for one request, capped at `cap` units.
    pub fn allowance(&mut self, cap: u32) -> Allowance<'_> {
        Allowance { frame: self, cap, left: cap }
    }
}

/// One request's share of the frame. Spending draws from both the request
/// cap and the shared frame budget.
#[derive(Debug)]
pub struct Allowance<'a> {
    frame: &'a mut FrameBudget,
    cap: u32,
    left: u32,
}

impl Allowance<'_> {
    pub fn exhausted(&self) -> bool {
        self.left == 0 || self.frame.remaining == 0
    }

    pub fn left(&self) -> u32 {
        self.left.min(self.frame.remaining)
    }

    /// Pays for one successor expansion.
    pub fn try_expand(&mut self) -> bool {
        if !self.take(1) {
            return false;
        }
        self.frame.expansions += 1;
        true
    }

    /// Pays a fixed charge, clamped to what a single frame could ever grant.
    pub fn charge_fixed(&mut self, cost: u32) -> bool {
        let cost = cost.min(self.cap).min(self.frame.total);
        self.take(cost)
    }

    fn take(&mut self, n: u32) -> bool {
        if n > self.left || n > self.frame.remaining {
            return false;
        }
        self.left -= n;
        self.frame.remaining -= n;
        true
    }
}
