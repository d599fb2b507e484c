//! Chain-structured factor graphs.
//!
//! ```text
//! prior -> [v_0] -> channel_1 -> [v_1] -> ... -> channel_{K-1} -> [v_{K-1}] -> likelihood
//! ```

use crate::channels::Channel;
use crate::likelihood::GaussianLikelihood;
use crate::prior::GaussianPrior;
use ndarray::Array1;
use rand::Rng;
use std::collections::HashMap;
use std::fmt::Display;

/// A prior over the last variable of the chain, composed from a
/// Gaussian prior and a sequence of channels. Every variable
/// introduced along the way is named and remembered.
#[derive(Debug)]
pub struct PriorChain {
    prior: GaussianPrior,
    variables: Vec<(String, usize)>,
    channels: Vec<Box<dyn Channel>>,
}

impl PriorChain {
    /// * `prior` - prior on the first variable
    /// * `id` - name of the first variable
    pub fn new(prior: GaussianPrior, id: &str) -> Self {
        let size = prior.size();
        Self {
            prior,
            variables: vec![(id.to_string(), size)],
            channels: vec![],
        }
    }

    /// Append `channel` after the current output and name its result `id`
    pub fn then<C>(mut self, channel: C, id: &str) -> anyhow::Result<Self>
    where
        C: Channel + 'static,
    {
        if channel.input_size() != self.output_size() {
            anyhow::bail!(
                "channel {} expects an input of size {}, but {} has size {}",
                channel.name(),
                channel.input_size(),
                self.output_id(),
                self.output_size()
            );
        }
        if self.variables.iter().any(|(x, _)| x == id) {
            anyhow::bail!("variable {} is already in the chain", id);
        }
        self.variables.push((id.to_string(), channel.output_size()));
        self.channels.push(Box::new(channel));
        Ok(self)
    }

    pub fn output_id(&self) -> &str {
        self.variables
            .last()
            .map(|(id, _)| id.as_str())
            .unwrap_or_default()
    }

    pub fn output_size(&self) -> usize {
        self.variables.last().map(|(_, n)| *n).unwrap_or(0)
    }

    /// Variable names from the prior outward
    pub fn variable_ids(&self) -> Vec<&str> {
        self.variables.iter().map(|(id, _)| id.as_str()).collect()
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn prior(&self) -> &GaussianPrior {
        &self.prior
    }

    pub fn channels(&self) -> &[Box<dyn Channel>] {
        &self.channels
    }

    /// Ancestral sample of every variable in the chain
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> HashMap<String, Array1<f64>> {
        let mut ret = HashMap::new();
        let mut current = self.prior.sample(rng);
        ret.insert(self.variables[0].0.clone(), current.clone());
        for (channel, (id, _)) in self.channels.iter().zip(self.variables.iter().skip(1)) {
            current = channel.sample(&current);
            ret.insert(id.clone(), current.clone());
        }
        ret
    }
}

/// A finalized chain: prior, channels and a likelihood on the last variable
#[derive(Debug)]
pub struct ChainModel {
    chain: PriorChain,
    likelihood: GaussianLikelihood,
}

impl ChainModel {
    pub fn new(chain: PriorChain, likelihood: GaussianLikelihood) -> anyhow::Result<Self> {
        if likelihood.size() != chain.output_size() {
            anyhow::bail!(
                "likelihood of size {} cannot observe {} of size {}",
                likelihood.size(),
                chain.output_id(),
                chain.output_size()
            );
        }
        Ok(Self { chain, likelihood })
    }

    pub fn chain(&self) -> &PriorChain {
        &self.chain
    }

    pub fn likelihood(&self) -> &GaussianLikelihood {
        &self.likelihood
    }

    pub fn num_variables(&self) -> usize {
        self.chain.num_variables()
    }

    pub fn variable_index(&self, id: &str) -> Option<usize> {
        self.chain.variables.iter().position(|(x, _)| x == id)
    }

    pub fn variable_size(&self, index: usize) -> usize {
        self.chain.variables[index].1
    }

    /// Sample the chain and an observation `y` of its last variable
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> HashMap<String, Array1<f64>> {
        let mut ret = self.chain.sample(rng);
        if let Some(last) = ret.get(self.chain.output_id()) {
            let y = self.likelihood.sample(last, rng);
            ret.insert("y".to_string(), y);
        }
        ret
    }
}

impl Display for ChainModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let vars = &self.chain.variables;
        write!(f, "GaussianPrior({})", self.chain.prior.size())?;
        write!(f, " -> [{}:{}]", vars[0].0, vars[0].1)?;
        for (channel, (id, n)) in self.chain.channels.iter().zip(vars.iter().skip(1)) {
            write!(f, " -> {} -> [{}:{}]", channel.name(), id, n)?;
        }
        write!(
            f,
            " -> GaussianLikelihood(var={})",
            self.likelihood.var()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::{LinearChannel, PiecewiseLinearChannel};
    use ndarray::Array2;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn chain_tracks_ids_and_sizes() -> anyhow::Result<()> {
        let chain = PriorChain::new(GaussianPrior::new(3), "z")
            .then(LinearChannel::new(Array2::ones((5, 3)))?, "wz")?
            .then(PiecewiseLinearChannel::relu(5), "x")?;

        assert_eq!(chain.variable_ids(), vec!["z", "wz", "x"]);
        assert_eq!(chain.output_size(), 5);

        let sample = chain.sample(&mut StdRng::seed_from_u64(1));
        assert!(sample["x"].iter().all(|&x| x >= 0.0));

        let model = ChainModel::new(chain, GaussianLikelihood::new(Array1::zeros(5), 0.1)?)?;
        assert_eq!(model.variable_index("wz"), Some(1));
        let shown = model.to_string();
        assert!(shown.contains("[wz:5] -> relu -> [x:5]"));
        Ok(())
    }

    #[test]
    fn chain_rejects_mismatched_sizes() -> anyhow::Result<()> {
        let chain = PriorChain::new(GaussianPrior::new(3), "z");
        assert!(chain.then(PiecewiseLinearChannel::relu(4), "x").is_err());

        let chain = PriorChain::new(GaussianPrior::new(3), "z");
        let lik = GaussianLikelihood::new(Array1::zeros(4), 1.0)?;
        assert!(ChainModel::new(chain, lik).is_err());

        let chain = PriorChain::new(GaussianPrior::new(3), "z");
        assert!(chain.then(PiecewiseLinearChannel::relu(3), "z").is_err());
        Ok(())
    }
}
