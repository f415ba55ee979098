use serde::Serialize;

/// The two alleles segregating at a biallelic site
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, Serialize)]
pub enum SiteAllele {
    /// Reference-like allele, "A" in the genotype labels
    A,
    /// Alternate allele, "B" in the genotype labels
    B
}

impl SiteAllele {
    /// Converts into a basic count representation. Useful for counting alternate alleles in a batch.
    pub fn to_allele_count(&self) -> u8 {
        match self {
            SiteAllele::A => 0,
            SiteAllele::B => 1,
        }
    }
}

/// Captures the unordered genotype states we can observe at a biallelic site in a diploid organism.
/// The discriminant doubles as the column index into a likelihood triple.
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum DiploidGenotype {
    /// A/A
    #[default]
    HomozygousA = 0,
    /// A/B
    Heterozygous = 1,
    /// B/B
    HomozygousB = 2
}

impl DiploidGenotype {
    /// All genotypes in likelihood column order
    pub const ALL: [DiploidGenotype; 3] = [
        DiploidGenotype::HomozygousA,
        DiploidGenotype::Heterozygous,
        DiploidGenotype::HomozygousB
    ];

    /// Returns the column index of this genotype in an AA/AB/BB triple
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Number of B alleles carried by this genotype
    pub fn alt_count(&self) -> usize {
        let (a1, a2) = self.decompose_alleles();
        (a1.to_allele_count() + a2.to_allele_count()) as usize
    }

    /// The genotype with exactly one more B allele, None if this is already B/B
    pub fn next(&self) -> Option<Self> {
        match self {
            DiploidGenotype::HomozygousA => Some(DiploidGenotype::Heterozygous),
            DiploidGenotype::Heterozygous => Some(DiploidGenotype::HomozygousB),
            DiploidGenotype::HomozygousB => None,
        }
    }

    /// Splits the genotype into its two alleles
    pub fn decompose_alleles(&self) -> (SiteAllele, SiteAllele) {
        match self {
            DiploidGenotype::HomozygousA => (SiteAllele::A, SiteAllele::A),
            DiploidGenotype::Heterozygous => (SiteAllele::A, SiteAllele::B),
            DiploidGenotype::HomozygousB => (SiteAllele::B, SiteAllele::B),
        }
    }

    /// VCF-style unphased genotype string
    pub fn gt_string(&self) -> &'static str {
        match self {
            DiploidGenotype::HomozygousA => "0/0",
            DiploidGenotype::Heterozygous => "0/1",
            DiploidGenotype::HomozygousB => "1/1",
        }
    }
}
